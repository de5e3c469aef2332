use crate::criterion::{is_homogeneous, NodeStats};
use crate::data::{EncodedTargets, TrainingSample};
use crate::errors::TreeError;
use crate::node::{Node, NodeType};
use crate::splitter::Splitter;
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::fmt::{self, Display};

/// Stopping rules of the recursive build that are not owned by the splitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
}

/// Binary decision tree stored as an arena of nodes keyed by id, root at 0.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub nodes: HashMap<usize, Node>,
    pub depth: usize,
    pub n_leaves: usize,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Tree {
            nodes: HashMap::new(),
            depth: 0,
            n_leaves: 0,
        }
    }

    /// Grow the tree over all `samples`, replacing any previous nodes.
    pub fn fit<T: Splitter>(
        &mut self,
        samples: &[TrainingSample],
        targets: &EncodedTargets,
        splitter: &T,
        params: &TreeParams,
    ) -> Result<(), TreeError> {
        self.nodes.clear();
        self.depth = 0;
        self.n_leaves = 0;

        if samples.len() < params.min_samples_split || samples.is_empty() {
            return Err(TreeError::InsufficientSamples(samples.len(), params.min_samples_split));
        }
        if targets.len() != samples.len() {
            return Err(TreeError::BuildFailed(format!(
                "{} targets provided for {} samples",
                targets.len(),
                samples.len()
            )));
        }

        let index: Vec<usize> = (0..samples.len()).collect();
        self.build_node(samples, targets, splitter, params, index, 0, NodeType::Root, 0);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node<T: Splitter>(
        &mut self,
        samples: &[TrainingSample],
        targets: &EncodedTargets,
        splitter: &T,
        params: &TreeParams,
        index: Vec<usize>,
        depth: usize,
        node_type: NodeType,
        parent_node: usize,
    ) -> usize {
        let num = self.nodes.len();
        let stats = NodeStats::compute(splitter.get_criterion(), targets, &index);
        let parent_impurity = stats.impurity;
        self.nodes.insert(num, Node::new(num, depth, node_type, parent_node, stats));
        self.depth = max(self.depth, depth);

        let n = index.len();
        let min_leaf = splitter.get_min_samples_leaf();
        if depth >= params.max_depth
            || n < params.min_samples_split
            || n < min_leaf.saturating_mul(2)
            || is_homogeneous(targets, &index)
        {
            self.n_leaves += 1;
            return num;
        }

        let mut split_info = match splitter.best_split(samples, targets, &index, parent_impurity) {
            Some(s) if s.left_index.len() >= min_leaf && s.right_index.len() >= min_leaf => s,
            _ => {
                self.n_leaves += 1;
                return num;
            }
        };
        drop(index);

        let left_index = std::mem::take(&mut split_info.left_index);
        let right_index = std::mem::take(&mut split_info.right_index);
        let left_child = self.build_node(samples, targets, splitter, params, left_index, depth + 1, NodeType::Left, num);
        let right_child =
            self.build_node(samples, targets, splitter, params, right_index, depth + 1, NodeType::Right, num);
        if let Some(node) = self.nodes.get_mut(&num) {
            node.make_parent_node(&split_info, left_child, right_child);
        }
        num
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(&0)
    }

    /// Remove the node and everything below it.
    pub fn remove_children(&mut self, node_idx: usize) {
        if let Some(removed_node) = self.nodes.remove(&node_idx) {
            if !removed_node.is_leaf {
                self.remove_children(removed_node.left_child);
                self.remove_children(removed_node.right_child);
            }
        }
    }

    /// Drop the descendants of a node and make it a leaf.
    pub fn collapse(&mut self, node_idx: usize) {
        let children = match self.nodes.get(&node_idx) {
            Some(node) if !node.is_leaf => (node.left_child, node.right_child),
            _ => return,
        };
        self.remove_children(children.0);
        self.remove_children(children.1);
        if let Some(node) = self.nodes.get_mut(&node_idx) {
            node.make_leaf_node();
        }
    }

    /// Recompute `depth` and `n_leaves` after structural changes.
    pub fn refresh_stats(&mut self) {
        self.depth = self.max_depth();
        self.n_leaves = self.leaf_count();
    }

    /// Check that the arena is a proper tree below the root.
    ///
    /// Every internal node must carry a threshold on a known feature and two
    /// distinct existing children with larger ids, each node is reachable at
    /// most once, and no path is deeper than `max_depth`. The walk is iterative
    /// so that a malformed arena cannot exhaust the stack.
    pub fn check_structure(&self, n_features: usize, max_depth: usize) -> Result<(), String> {
        let mut visited: HashSet<usize> = HashSet::new();
        let mut stack: Vec<(usize, usize)> = vec![(0, 0)];
        while let Some((idx, depth)) = stack.pop() {
            let node = self.nodes.get(&idx).ok_or_else(|| format!("node {} is missing", idx))?;
            if !visited.insert(idx) {
                return Err(format!("node {} is reached twice", idx));
            }
            if depth > max_depth {
                return Err(format!("node {} lies at depth {} beyond {}", idx, depth, max_depth));
            }
            if node.is_leaf {
                continue;
            }
            if node.split_value.is_none() || node.split_feature >= n_features {
                return Err(format!("node {} has no valid split", idx));
            }
            if node.left_child == node.right_child {
                return Err(format!("node {} has the same child on both sides", idx));
            }
            for child in [node.left_child, node.right_child] {
                if child <= idx {
                    return Err(format!("node {} points back to node {}", idx, child));
                }
                stack.push((child, depth + 1));
            }
        }
        Ok(())
    }

    fn count_nodes(&self, idx: usize, leaves_only: bool) -> usize {
        match self.nodes.get(&idx) {
            None => 0,
            Some(node) if node.is_leaf => 1,
            Some(node) => {
                let own = if leaves_only { 0 } else { 1 };
                own + self.count_nodes(node.left_child, leaves_only) + self.count_nodes(node.right_child, leaves_only)
            }
        }
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        self.count_nodes(0, false)
    }

    pub fn leaf_count(&self) -> usize {
        self.count_nodes(0, true)
    }

    fn node_depth(&self, idx: usize) -> usize {
        match self.nodes.get(&idx) {
            Some(node) if !node.is_leaf => {
                1 + max(self.node_depth(node.left_child), self.node_depth(node.right_child))
            }
            _ => 0,
        }
    }

    /// Length of the longest root-to-leaf path; 0 for a single leaf or an empty tree.
    pub fn max_depth(&self) -> usize {
        self.node_depth(0)
    }

    /// Sum of the impurities of the current leaves below `idx`.
    pub fn leaf_impurity_sum(&self, idx: usize) -> f64 {
        match self.nodes.get(&idx) {
            None => 0.0,
            Some(node) if node.is_leaf => node.impurity,
            Some(node) => self.leaf_impurity_sum(node.left_child) + self.leaf_impurity_sum(node.right_child),
        }
    }

    /// Ids of the internal nodes in post-order (children before parents).
    pub fn post_order_internal(&self) -> Vec<usize> {
        let mut order = Vec::new();
        self.collect_post_order(0, &mut order);
        order
    }

    fn collect_post_order(&self, idx: usize, order: &mut Vec<usize>) {
        if let Some(node) = self.nodes.get(&idx) {
            if !node.is_leaf {
                self.collect_post_order(node.left_child, order);
                self.collect_post_order(node.right_child, order);
                order.push(idx);
            }
        }
    }

    /// Impurity decrease attributed to each feature, normalized to sum to 1.
    ///
    /// Every internal node adds `(impurity - weighted child impurity) * n_samples`
    /// to its split feature. All zeros when the tree has no useful split.
    pub fn calculate_feature_importance(&self, n_features: usize) -> Vec<f64> {
        let mut importance = vec![0.0; n_features];
        for idx in self.post_order_internal() {
            let node = &self.nodes[&idx];
            let (Some(left), Some(right)) = (self.nodes.get(&node.left_child), self.nodes.get(&node.right_child))
            else {
                continue;
            };
            let n = node.n_samples as f64;
            let weighted = (left.n_samples as f64 * left.impurity + right.n_samples as f64 * right.impurity) / n;
            let decrease = (node.impurity - weighted).max(0.0);
            if let Some(v) = importance.get_mut(node.split_feature) {
                *v += decrease * n;
            }
        }
        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            importance.iter_mut().for_each(|v| *v /= total);
        }
        importance
    }

    /// Indented dump of the tree, naming features with `feature_names`
    /// (falling back to the feature index).
    pub fn render(&self, feature_names: &[String]) -> String {
        let mut print_buffer: Vec<usize> = vec![0];
        let mut r = String::new();
        while let Some(idx) = print_buffer.pop() {
            let Some(node) = self.nodes.get(&idx) else {
                continue;
            };
            let name = feature_names
                .get(node.split_feature)
                .cloned()
                .unwrap_or_else(|| node.split_feature.to_string());
            r += format!("{}{}\n", "      ".repeat(node.depth).as_str(), node.describe(&name)).as_str();
            if !node.is_leaf {
                print_buffer.push(node.right_child);
                print_buffer.push(node.left_child);
            }
        }
        r
    }
}

impl Display for Tree {
    // This trait requires `fmt` with this exact signature.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.render(&[]))
    }
}
