//! Mesh tree layout for the simulator
//!
//! Nodes are numbered breadth-first: node 0 is the root and node `i` hangs
//! off node `(i - 1) / fanout`. A node's platform routing table is itself
//! followed by every node beneath it, so the root's table lists the whole
//! mesh.

use std::net::Ipv4Addr;

use chargemesh_core::NodeAddress;

/// Static description of one simulated node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimNodeSpec {
    pub index: usize,
    pub address: NodeAddress,
    pub ip: Ipv4Addr,
    /// Depth in the tree, root is 1
    pub layer: i32,
    pub parent: Option<usize>,
}

/// A tree-shaped mesh
#[derive(Debug, Clone)]
pub struct MeshTree {
    nodes: Vec<SimNodeSpec>,
    fanout: usize,
}

impl MeshTree {
    /// Build a tree of `count` nodes where each node has at most `fanout`
    /// children
    pub fn new(count: usize, fanout: usize) -> Self {
        let fanout = fanout.max(1);
        let mut nodes: Vec<SimNodeSpec> = Vec::with_capacity(count);

        for index in 0..count {
            let parent = (index > 0).then(|| (index - 1) / fanout);
            let layer = parent.map_or(1, |p| nodes[p].layer + 1);
            nodes.push(SimNodeSpec {
                index,
                address: Self::address_for(index),
                ip: Self::ip_for(index),
                layer,
                parent,
            });
        }

        Self { nodes, fanout }
    }

    /// Hardware address of node `index`
    pub fn address_for(index: usize) -> NodeAddress {
        let [hi, lo] = (index as u16).to_be_bytes();
        NodeAddress::new([0x24, 0x0a, 0xc4, 0x00, hi, lo])
    }

    /// Address handed out to node `index`; the root gets `10.0.0.1`
    pub fn ip_for(index: usize) -> Ipv4Addr {
        let host = index as u32 + 1;
        Ipv4Addr::from(u32::from(Ipv4Addr::new(10, 0, 0, 0)) + host)
    }

    pub fn nodes(&self) -> &[SimNodeSpec] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Layer of the deepest node, 0 for an empty tree
    pub fn depth(&self) -> i32 {
        self.nodes.last().map_or(0, |n| n.layer)
    }

    /// Direct children of `index`
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let first = index * self.fanout + 1;
        (first..first + self.fanout).filter(|&c| c < self.nodes.len())
    }

    /// Platform routing table of `index`: itself, then its subtree
    /// breadth-first
    pub fn routing_table(&self, index: usize) -> Vec<NodeAddress> {
        let mut order = vec![index];
        let mut i = 0;
        while i < order.len() {
            order.extend(self.children(order[i]));
            i += 1;
        }
        order.into_iter().map(|n| self.nodes[n].address).collect()
    }

    /// ASCII rendering, one node per line indented by depth
    pub fn visualize(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            let indent = "  ".repeat((node.layer - 1) as usize);
            out.push_str(&format!("{}{} {} (layer {})\n", indent, node.address, node.ip, node.layer));

            let mut children: Vec<_> = self.children(index).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shape() {
        let tree = MeshTree::new(7, 2);
        let layers: Vec<_> = tree.nodes().iter().map(|n| n.layer).collect();
        assert_eq!(layers, vec![1, 2, 2, 3, 3, 3, 3]);
        assert_eq!(tree.nodes()[5].parent, Some(2));
    }

    #[test]
    fn test_root_table_lists_everyone_root_first() {
        let tree = MeshTree::new(6, 2);
        let table = tree.routing_table(0);
        assert_eq!(table.len(), 6);
        assert_eq!(table[0], MeshTree::address_for(0));
    }

    #[test]
    fn test_subtree_tables() {
        let tree = MeshTree::new(7, 2);
        assert_eq!(
            tree.routing_table(1),
            vec![
                MeshTree::address_for(1),
                MeshTree::address_for(3),
                MeshTree::address_for(4)
            ]
        );
        assert_eq!(tree.routing_table(6), vec![MeshTree::address_for(6)]);
    }

    #[test]
    fn test_depth() {
        assert_eq!(MeshTree::new(0, 2).depth(), 0);
        assert_eq!(MeshTree::new(1, 2).depth(), 1);
        assert_eq!(MeshTree::new(7, 2).depth(), 3);
        assert_eq!(MeshTree::new(8, 2).depth(), 4);
        assert_eq!(MeshTree::new(4, 1).depth(), 4);
    }

    #[test]
    fn test_addresses() {
        assert_eq!(MeshTree::ip_for(0), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(MeshTree::ip_for(255), Ipv4Addr::new(10, 0, 1, 0));
        assert_ne!(MeshTree::address_for(1), MeshTree::address_for(257));
    }

    #[test]
    fn test_visualize() {
        let text = MeshTree::new(3, 2).visualize();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("  "));
    }
}
