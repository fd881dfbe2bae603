//! Frame tree, a `PoseSource` built from named rigid transforms

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{PoisonError, RwLock};

use super::{LocError, Pose, PoseSource};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A graph of frames linked by the pose of each child in its parent.
///
/// Lookups search the graph breadth first, walking edges in either direction
/// and inverting them as needed, so any two connected frames can be related.
/// Edges can be replaced or removed at any time from other threads.
#[derive(Debug, Default)]
pub struct FrameTree {
    /// `edges[parent][child]` is the pose of `child` in `parent`
    edges: RwLock<HashMap<String, HashMap<String, Pose>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FrameTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pose of `child` in `parent`.
    pub fn set_transform(&self, parent: &str, child: &str, pose: Pose) {
        let mut edges = self.edges.write().unwrap_or_else(PoisonError::into_inner);
        edges
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string(), pose);
    }

    /// Remove the link between `parent` and `child`, making frames only
    /// reachable through it unavailable.
    pub fn remove_transform(&self, parent: &str, child: &str) {
        let mut edges = self.edges.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(children) = edges.get_mut(parent) {
            children.remove(child);
        }
    }
}

impl PoseSource for FrameTree {
    fn lookup(&self, from_frame: &str, to_frame: &str) -> Result<Pose, LocError> {
        let edges = self.edges.read().unwrap_or_else(PoisonError::into_inner);

        let unavailable = || LocError::FrameUnavailable {
            from: from_frame.to_string(),
            to: to_frame.to_string(),
        };

        // A frame nobody has mentioned does not exist, even as its own parent
        let known = |f: &str| {
            edges.contains_key(f) || edges.values().any(|children| children.contains_key(f))
        };
        if !known(from_frame) || !known(to_frame) {
            return Err(unavailable());
        }

        // Search outwards from the target frame, carrying the pose of the
        // current frame in the target frame.
        let mut queue: VecDeque<(String, Pose)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();

        queue.push_back((to_frame.to_string(), Pose::identity()));
        visited.insert(to_frame.to_string());

        while let Some((current, in_target)) = queue.pop_front() {
            if current == from_frame {
                return Ok(in_target);
            }

            // Down the tree: child in target = current in target * child in current
            if let Some(children) = edges.get(&current) {
                for (child, pose) in children {
                    if visited.insert(child.clone()) {
                        queue.push_back((child.clone(), in_target.compose(pose)));
                    }
                }
            }

            // Up the tree: parent in target = current in target * (current in parent)^-1
            for (parent, children) in edges.iter() {
                if let Some(pose) = children.get(&current) {
                    if visited.insert(parent.clone()) {
                        queue.push_back((parent.clone(), in_target.compose(&pose.inverse())));
                    }
                }
            }
        }

        Err(unavailable())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn tree() -> FrameTree {
        let tree = FrameTree::new();
        tree.set_transform("map", "odom", Pose::new(1.0, 0.0, FRAC_PI_2));
        tree.set_transform("odom", "base_link", Pose::new(2.0, 0.0, 0.0));
        tree
    }

    #[test]
    fn test_lookup_down_and_up() {
        let tree = tree();

        // Robot in map: odom is rotated 90 deg, so 2 m along odom X is 2 m
        // along map Y
        let base_in_map = tree.lookup("base_link", "map").unwrap();
        assert!((base_in_map.position_m[0] - 1.0).abs() < 1e-12);
        assert!((base_in_map.position_m[1] - 2.0).abs() < 1e-12);
        assert!((base_in_map.heading_rad - FRAC_PI_2).abs() < 1e-12);

        // And the map origin seen from the robot
        let map_in_base = tree.lookup("map", "base_link").unwrap();
        let back = base_in_map.compose(&map_in_base);
        assert!(back.distance() < 1e-12);
        assert!(back.heading_rad.abs() < 1e-12);

        assert_eq!(tree.lookup("odom", "odom").unwrap(), Pose::identity());
    }

    #[test]
    fn test_unavailable() {
        let tree = tree();

        assert!(matches!(
            tree.lookup("base_link", "earth"),
            Err(LocError::FrameUnavailable { .. })
        ));

        tree.remove_transform("map", "odom");
        assert!(tree.lookup("base_link", "map").is_err());
        assert!(tree.lookup("base_link", "odom").is_ok());
    }
}
