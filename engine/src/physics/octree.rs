//! Loose octree spatial index
//!
//! Reduces all-pairs testing to a candidate list. Cells live in a flat arena
//! (`Vec<OctreeNode>`) addressed by [`NodeId`]; the parent link is a plain
//! index so ownership only flows downward.
//!
//! # Policy
//!
//! - A leaf holds up to `capacity` residents, then splits into 8 equal octants.
//! - A body moves into a child only if its bounding sphere fits strictly inside
//!   the child. Bodies straddling a boundary stay with the parent, so shared
//!   boundaries never cause runaway subdivision.
//! - Each step [`Octree::update`] lifts bodies that left their cell to the
//!   nearest ancestor containing them (send up), pushes residents back down
//!   where they fit (redistribute), and rebuilds the per-cell caches of
//!   descendant bodies.
//! - A subdivided cell whose whole subtree holds no more than `capacity`
//!   bodies collapses back into a leaf, and the arena is compacted. Cell
//!   count therefore tracks where bodies are now, not everywhere they have been.
//! - Bodies outside the root cell stay resident at the root.
//! - Subdivision stops at `max_depth` so coincident bodies cannot split forever.
//!
//! # Example
//!
//! ```ignore
//! let mut octree = Octree::new(&OctreeConfig::default());
//! octree.insert(handle, &bodies);
//! octree.update(&bodies);
//! octree.cull_pairs(&bodies, &mut pairs);
//! ```

use std::collections::VecDeque;

use glam::Vec3;
use slotmap::SecondaryMap;

use super::body::BodySet;
use super::broadphase::{CollisionPair, bounding_spheres_overlap};
use super::config::OctreeConfig;
use super::debug_draw::{DebugDrawList, OCTREE_COLOR};
use super::types::BodyHandle;

/// Index of a cell in the octree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

/// One octree cell.
#[derive(Debug, Clone)]
pub struct OctreeNode {
    origin: Vec3,
    extent: Vec3,
    depth: u32,
    parent: Option<NodeId>,
    children: Option<[NodeId; 8]>,
    residents: Vec<BodyHandle>,
    descendants: Vec<BodyHandle>,
}

impl OctreeNode {
    fn new(origin: Vec3, extent: Vec3, depth: u32, parent: Option<NodeId>) -> Self {
        Self {
            origin,
            extent,
            depth,
            parent,
            children: None,
            residents: Vec::new(),
            descendants: Vec::new(),
        }
    }

    /// Minimum corner.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Size along each axis.
    pub fn extent(&self) -> Vec3 {
        self.extent
    }

    /// Depth below the root (root = 0).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Parent cell, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Bodies stored directly in this cell.
    pub fn residents(&self) -> &[BodyHandle] {
        &self.residents
    }

    /// True if a sphere at `position` with `radius` lies strictly inside.
    pub fn fits(&self, position: Vec3, radius: f32) -> bool {
        (position - radius).cmpgt(self.origin).all()
            && (position + radius).cmplt(self.origin + self.extent).all()
    }
}

/// Arena-backed loose octree over body handles.
#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    location: SecondaryMap<BodyHandle, NodeId>,
    capacity: usize,
    max_depth: u32,
}

impl Octree {
    /// Creates an empty tree with a single root cell.
    pub fn new(config: &OctreeConfig) -> Self {
        Self {
            nodes: vec![OctreeNode::new(config.origin, config.extent, 0, None)],
            location: SecondaryMap::new(),
            capacity: config.capacity.max(1),
            max_depth: config.max_depth,
        }
    }

    /// Number of registered bodies.
    pub fn len(&self) -> usize {
        self.location.len()
    }

    /// True if no bodies are registered.
    pub fn is_empty(&self) -> bool {
        self.location.is_empty()
    }

    /// True if `handle` is registered.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.location.contains_key(handle)
    }

    /// Number of allocated cells.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest level currently allocated.
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Cell currently holding `handle`.
    pub fn node_of(&self, handle: BodyHandle) -> Option<&OctreeNode> {
        self.location.get(handle).map(|id| &self.nodes[id.0])
    }

    /// Sum of every cell's resident list.
    ///
    /// Equals [`len`](Self::len) unless a body was lost or duplicated.
    pub fn total_resident_count(&self) -> usize {
        self.nodes.iter().map(|n| n.residents.len()).sum()
    }

    /// Bodies found by walking the root: its residents plus its descendant cache.
    ///
    /// Only meaningful after [`update`](Self::update).
    pub fn cached_body_count(&self) -> usize {
        let root = &self.nodes[ROOT.0];
        root.residents.len() + root.descendants.len()
    }

    /// Drops every cell and body.
    pub fn clear(&mut self) {
        self.nodes.truncate(1);
        let root = &mut self.nodes[ROOT.0];
        root.children = None;
        root.residents.clear();
        root.descendants.clear();
        self.location.clear();
    }

    /// Registers a body, placing it in the deepest existing cell that contains it.
    ///
    /// Unknown handles are ignored. Call [`update`](Self::update) before culling.
    pub fn insert(&mut self, handle: BodyHandle, bodies: &BodySet) {
        if self.location.contains_key(handle) {
            return;
        }
        let Some((position, radius)) = body_bounds(bodies, handle) else {
            return;
        };
        let node = self.descend(ROOT, position, radius);
        self.push_resident(node, handle, bodies);
    }

    /// Deregisters a body. Returns false if it was not registered.
    pub fn remove(&mut self, handle: BodyHandle) -> bool {
        let Some(node) = self.location.remove(handle) else {
            return false;
        };
        let residents = &mut self.nodes[node.0].residents;
        if let Some(index) = residents.iter().position(|h| *h == handle) {
            residents.swap_remove(index);
        }
        true
    }

    /// Per-step maintenance: send up, redistribute, rebuild descendant caches,
    /// then collapse cells that no longer need their children.
    pub fn update(&mut self, bodies: &BodySet) {
        self.send_up(bodies);
        self.redistribute(bodies);
        self.rebuild_descendants();
        self.collapse_sparse_cells();
    }

    /// Appends every candidate pair to `out`.
    ///
    /// Residents are tested against each other and, when the cell is
    /// subdivided, against every descendant body. Each pair is produced once.
    pub fn cull_pairs(&self, bodies: &BodySet, out: &mut Vec<CollisionPair>) {
        let mut push_if_close = |a: BodyHandle, b: BodyHandle| {
            if let (Some(body_a), Some(body_b)) = (bodies.get(a), bodies.get(b)) {
                if bounding_spheres_overlap(body_a, body_b) {
                    out.push(CollisionPair::new(a, b));
                }
            }
        };

        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            for (i, &a) in node.residents.iter().enumerate() {
                for &b in &node.residents[i + 1..] {
                    push_if_close(a, b);
                }
            }
            if let Some(children) = node.children {
                for &a in &node.residents {
                    for &b in &node.descendants {
                        push_if_close(a, b);
                    }
                }
                stack.extend(children);
            }
        }
    }

    /// Emits every cell boundary.
    pub fn debug_draw(&self, out: &mut DebugDrawList) {
        for node in &self.nodes {
            out.aabb(node.origin, node.extent, OCTREE_COLOR);
        }
    }

    fn descend(&self, mut node: NodeId, position: Vec3, radius: f32) -> NodeId {
        while let Some(children) = self.nodes[node.0].children {
            match children
                .iter()
                .find(|c| self.nodes[c.0].fits(position, radius))
            {
                Some(&child) => node = child,
                None => break,
            }
        }
        node
    }

    fn push_resident(&mut self, node: NodeId, handle: BodyHandle, bodies: &BodySet) {
        self.nodes[node.0].residents.push(handle);
        self.location.insert(handle, node);
        if self.nodes[node.0].residents.len() > self.capacity {
            self.subdivide(node, bodies);
        }
    }

    // Pushes every resident that fits a child down into it, creating the
    // children first if needed.
    fn subdivide(&mut self, node: NodeId, bodies: &BodySet) {
        let existing = self.nodes[node.0].children;
        let children = match existing {
            Some(children) => children,
            None if self.nodes[node.0].depth < self.max_depth => self.create_children(node),
            None => return,
        };

        let residents = std::mem::take(&mut self.nodes[node.0].residents);
        let mut kept = Vec::with_capacity(residents.len());
        let mut moved = Vec::new();
        for handle in residents {
            let target = body_bounds(bodies, handle).and_then(|(position, radius)| {
                children
                    .iter()
                    .find(|c| self.nodes[c.0].fits(position, radius))
                    .map(|&child| self.descend(child, position, radius))
            });
            match target {
                Some(child) => moved.push((child, handle)),
                None => kept.push(handle),
            }
        }
        self.nodes[node.0].residents = kept;

        for (child, handle) in moved {
            self.push_resident(child, handle, bodies);
        }
    }

    fn create_children(&mut self, node: NodeId) -> [NodeId; 8] {
        let parent = &self.nodes[node.0];
        let half = parent.extent * 0.5;
        let origin = parent.origin;
        let depth = parent.depth + 1;

        let mut ids = [ROOT; 8];
        for (i, id) in ids.iter_mut().enumerate() {
            let octant = Vec3::new(
                ((i >> 2) & 1) as f32,
                ((i >> 1) & 1) as f32,
                (i & 1) as f32,
            );
            *id = NodeId(self.nodes.len());
            self.nodes
                .push(OctreeNode::new(origin + octant * half, half, depth, Some(node)));
        }
        self.nodes[node.0].children = Some(ids);
        ids
    }

    fn send_up(&mut self, bodies: &BodySet) {
        // Parents are always allocated before their children, so every
        // ancestor has a smaller index than the cell being drained.
        for index in 1..self.nodes.len() {
            if self.nodes[index].residents.is_empty() {
                continue;
            }
            let residents = std::mem::take(&mut self.nodes[index].residents);
            let mut kept = Vec::with_capacity(residents.len());
            for handle in residents {
                let Some((position, radius)) = body_bounds(bodies, handle) else {
                    kept.push(handle);
                    continue;
                };
                if self.nodes[index].fits(position, radius) {
                    kept.push(handle);
                    continue;
                }
                let target = self.containing_ancestor(NodeId(index), position, radius);
                self.nodes[target.0].residents.push(handle);
                self.location.insert(handle, target);
            }
            self.nodes[index].residents = kept;
        }
    }

    fn containing_ancestor(&self, node: NodeId, position: Vec3, radius: f32) -> NodeId {
        let mut current = self.nodes[node.0].parent;
        while let Some(id) = current {
            if id == ROOT || self.nodes[id.0].fits(position, radius) {
                return id;
            }
            current = self.nodes[id.0].parent;
        }
        ROOT
    }

    fn redistribute(&mut self, bodies: &BodySet) {
        // Top-down; the arena may grow while we walk it.
        let mut index = 0;
        while index < self.nodes.len() {
            let node = &self.nodes[index];
            if node.children.is_some() || node.residents.len() > self.capacity {
                self.subdivide(NodeId(index), bodies);
            }
            index += 1;
        }
    }

    fn rebuild_descendants(&mut self) {
        // Children always sit after their parent, so a reverse walk is post-order.
        for index in (0..self.nodes.len()).rev() {
            let mut gathered = std::mem::take(&mut self.nodes[index].descendants);
            gathered.clear();
            if let Some(children) = self.nodes[index].children {
                for child in children {
                    let child = &self.nodes[child.0];
                    gathered.extend_from_slice(&child.descendants);
                    gathered.extend_from_slice(&child.residents);
                }
            }
            self.nodes[index].descendants = gathered;
        }
    }

    // Rebuilds the arena breadth-first from the root, merging every sparse
    // subtree into its top cell. Breadth-first order keeps each parent ahead of
    // its children, which send up and the descendant rebuild rely on.
    fn collapse_sparse_cells(&mut self) {
        let capacity = self.capacity;
        let sparse = |node: &OctreeNode| {
            node.children.is_some() && node.residents.len() + node.descendants.len() <= capacity
        };
        if !self.nodes.iter().any(|n| sparse(n)) {
            return;
        }

        let mut old = std::mem::take(&mut self.nodes);
        let mut queue = VecDeque::from([(ROOT, None)]);
        let mut next_id = 1;
        while let Some((old_id, parent)) = queue.pop_front() {
            let id = NodeId(self.nodes.len());
            let source = &mut old[old_id.0];
            let collapse = sparse(&*source);

            let mut node = OctreeNode::new(source.origin, source.extent, source.depth, parent);
            node.residents = std::mem::take(&mut source.residents);
            node.descendants = std::mem::take(&mut source.descendants);
            if collapse {
                let merged = std::mem::take(&mut node.descendants);
                node.residents.extend(merged);
            } else if let Some(children) = source.children {
                let mut ids = [ROOT; 8];
                for (slot, child) in ids.iter_mut().zip(children) {
                    *slot = NodeId(next_id);
                    next_id += 1;
                    queue.push_back((child, Some(id)));
                }
                node.children = Some(ids);
            }

            for &handle in &node.residents {
                self.location.insert(handle, id);
            }
            self.nodes.push(node);
        }
    }
}

fn body_bounds(bodies: &BodySet, handle: BodyHandle) -> Option<(Vec3, f32)> {
    bodies
        .get(handle)
        .map(|body| (body.position(), body.bounding_radius()))
}
