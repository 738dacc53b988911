use calco_ids::NodeID;

use crate::node::SceneNode;

/// Arena-based storage for scene nodes.
///
/// Slots are addressed by `NodeID` index; each slot carries a generation that
/// is bumped on removal, so a stale handle fails to resolve instead of
/// aliasing a reused slot. Index 0 is reserved as the nil sentinel.
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Option<SceneNode>>,
    generations: Vec<u32>,
    free_indices: Vec<usize>,
    live: u32,
}

impl NodeArena {
    pub fn new() -> Self {
        // Reserve index 0 as invalid/nil sentinel so first real node ID is 1.
        let mut nodes = Vec::with_capacity(2);
        let mut generations = Vec::with_capacity(2);
        nodes.push(None);
        generations.push(0);
        Self {
            nodes,
            generations,
            free_indices: Vec::new(),
            live: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut arena = Self::new();
        arena.nodes.reserve(capacity);
        arena.generations.reserve(capacity);
        arena
    }

    /// Insert a node, returning a handle carrying index and generation.
    pub fn insert(&mut self, node: SceneNode) -> NodeID {
        self.live += 1;

        // Reuse a previously freed slot in O(1).
        if let Some(index) = self.free_indices.pop() {
            self.nodes[index] = Some(node);
            let generation = self.generations[index];
            return NodeID::from_parts(index as u32, generation);
        }

        let index = self.nodes.len();
        self.nodes.push(Some(node));
        self.generations.push(0);
        NodeID::from_parts(index as u32, 0)
    }

    #[inline]
    fn slot(&self, id: NodeID) -> Option<usize> {
        if id.is_nil()
            || id.index() == 0
            || id.index() >= self.nodes.len() as u32
            || self.generations[id.index() as usize] != id.generation()
        {
            return None;
        }
        Some(id.index() as usize)
    }

    /// Get a node by handle; `None` when the generation no longer matches.
    pub fn get(&self, id: NodeID) -> Option<&SceneNode> {
        self.nodes[self.slot(id)?].as_ref()
    }

    pub fn get_mut(&mut self, id: NodeID) -> Option<&mut SceneNode> {
        let slot = self.slot(id)?;
        self.nodes[slot].as_mut()
    }

    /// Remove a node, bumping the slot's generation so the handle goes stale.
    pub fn remove(&mut self, id: NodeID) -> Option<SceneNode> {
        let index = self.slot(id)?;
        let removed = self.nodes[index].take();
        if removed.is_some() {
            self.generations[index] = self.generations[index].wrapping_add(1);
            self.free_indices.push(index);
            self.live -= 1;
        }
        removed
    }

    /// Check whether a handle still points at a live node.
    pub fn contains(&self, id: NodeID) -> bool {
        self.slot(id)
            .is_some_and(|index| self.nodes[index].is_some())
    }

    /// Iterator over all live nodes.
    pub fn iter(&self) -> impl Iterator<Item = (NodeID, &SceneNode)> {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(index, node)| {
                node.as_ref()
                    .map(|n| (NodeID::from_parts(index as u32, self.generations[index]), n))
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeID, &mut SceneNode)> {
        self.nodes
            .iter_mut()
            .zip(self.generations.iter())
            .enumerate()
            .skip(1)
            .filter_map(|(index, (node, &generation))| {
                node.as_mut()
                    .map(|n| (NodeID::from_parts(index as u32, generation), n))
            })
    }

    /// Drop every node. Generations are reset too, so this is only safe when
    /// all outstanding handles are dropped with the scene (scene switch).
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.generations.clear();
        self.free_indices.clear();
        self.live = 0;
        self.nodes.push(None);
        self.generations.push(0);
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl Default for NodeArena {
    fn default() -> Self {
        Self::new()
    }
}
