//! Dependency ordering for compiler units using depth-first topological sort
use crate::error::{CompilerError, CompilerResult};
use std::cell::OnceCell;
use std::collections::HashMap;

/// A node in the dependency collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode<T> {
    /// Unique id
    pub id: String,
    /// Value returned by the ordering
    pub payload: T,
    /// Ids that must be ordered before this node
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Collection of payloads keyed by id, ordered by their prerequisites
///
/// Nodes are visited in registration order and every prerequisite is emitted
/// before its dependent, so the result is deterministic for a fixed sequence of
/// `add` calls. Prerequisites that were never registered count as satisfied.
#[derive(Debug, Clone)]
pub struct DependencyCollection<T> {
    nodes: Vec<DependencyNode<T>>,
    index: HashMap<String, usize>,
    accepts_duplicates: bool,
    order: OnceCell<Vec<usize>>,
}

impl<T> DependencyCollection<T> {
    /// Create an empty collection that rejects duplicate ids
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            accepts_duplicates: false,
            order: OnceCell::new(),
        }
    }

    /// Accept duplicate ids (the later registration replaces the earlier one)
    pub fn with_accepts_duplicates(mut self, accepts: bool) -> Self {
        self.accepts_duplicates = accepts;
        self
    }

    pub fn accepts_duplicates(&self) -> bool {
        self.accepts_duplicates
    }

    /// Register a payload under `id`
    ///
    /// A duplicate id fails with [`CompilerError::DuplicateId`] unless duplicates
    /// are accepted, in which case payload and prerequisites are replaced and the
    /// node keeps its original registration position.
    pub fn add<I, S>(&mut self, id: impl Into<String>, payload: T, dependencies: I) -> CompilerResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = id.into();
        let dependencies: Vec<String> = dependencies.into_iter().map(Into::into).collect();

        if let Some(&existing) = self.index.get(&id) {
            if !self.accepts_duplicates {
                return Err(CompilerError::DuplicateId(id));
            }
            let node = &mut self.nodes[existing];
            node.payload = payload;
            node.dependencies = dependencies;
        } else {
            self.index.insert(id.clone(), self.nodes.len());
            self.nodes.push(DependencyNode {
                id,
                payload,
                dependencies,
            });
        }

        self.order.take();
        Ok(())
    }

    /// Check whether an id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Get a payload by id
    pub fn get(&self, id: &str) -> Option<&T> {
        self.index.get(id).map(|&idx| &self.nodes[idx].payload)
    }

    /// Registered nodes in registration order
    pub fn nodes(&self) -> &[DependencyNode<T>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Prerequisites that were never registered, as `(dependent, missing)` pairs
    pub fn missing_dependencies(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.dependencies
                    .iter()
                    .filter(|dep| !self.index.contains_key(dep.as_str()))
                    .map(move |dep| (node.id.as_str(), dep.as_str()))
            })
            .collect()
    }

    /// Ids in dependency order
    pub fn ordered_ids(&self) -> CompilerResult<Vec<&str>> {
        Ok(self
            .order()?
            .iter()
            .map(|&idx| self.nodes[idx].id.as_str())
            .collect())
    }

    /// Payloads in dependency order
    pub fn ordered_elements(&self) -> CompilerResult<Vec<&T>> {
        Ok(self
            .order()?
            .iter()
            .map(|&idx| &self.nodes[idx].payload)
            .collect())
    }

    /// Consume the collection, returning payloads in dependency order
    pub fn into_ordered_elements(self) -> CompilerResult<Vec<T>> {
        let order = self.order()?.to_vec();
        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|n| Some(n.payload)).collect();
        Ok(order
            .into_iter()
            .filter_map(|idx| slots[idx].take())
            .collect())
    }

    /// Cached node order, computed on first use after a mutation
    fn order(&self) -> CompilerResult<&[usize]> {
        if let Some(order) = self.order.get() {
            return Ok(order);
        }

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut stack = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());

        for idx in 0..self.nodes.len() {
            self.visit(idx, &mut marks, &mut stack, &mut order)?;
        }

        Ok(self.order.get_or_init(|| order))
    }

    fn visit(
        &self,
        idx: usize,
        marks: &mut [Mark],
        stack: &mut Vec<usize>,
        order: &mut Vec<usize>,
    ) -> CompilerResult<()> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::InProgress => {
                let start = stack.iter().position(|&i| i == idx).unwrap_or(0);
                let cycle = stack[start..]
                    .iter()
                    .chain(std::iter::once(&idx))
                    .map(|&i| self.nodes[i].id.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(CompilerError::CircularDependency {
                    id: self.nodes[idx].id.clone(),
                    cycle,
                });
            }
            Mark::Unvisited => {}
        }

        marks[idx] = Mark::InProgress;
        stack.push(idx);

        for dep in &self.nodes[idx].dependencies {
            if let Some(&dep_idx) = self.index.get(dep) {
                self.visit(dep_idx, marks, stack, order)?;
            }
        }

        stack.pop();
        marks[idx] = Mark::Done;
        order.push(idx);
        Ok(())
    }
}

impl<T> Default for DependencyCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}
