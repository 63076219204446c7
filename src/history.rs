use std::collections::VecDeque;

use crate::canvas::CanvasBuffers;
use crate::graphics::{GraphicsBackend, TextureHandle};

/// Bounded undo/redo of whole-canvas snapshots.
///
/// Entries move between the stacks and the canvas front buffer; they are
/// never copied after capture. The undo stack holds at most `max_undo`
/// entries, oldest evicted first, and `max_undo == 0` turns capture off.
pub struct History<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    max_undo: usize,
}

impl<T: TextureHandle> History<T> {
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_undo,
        }
    }

    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Copies the canvas front onto the undo stack and clears redo. Does
    /// nothing when capture is off, the canvas has no buffers, or the copy
    /// fails.
    pub fn snapshot<B>(&mut self, backend: &mut B, canvas: &CanvasBuffers<T>)
    where
        B: GraphicsBackend<Texture = T>,
    {
        if self.max_undo == 0 {
            return;
        }
        let Some(front) = canvas.front() else {
            return;
        };
        match backend.copy_texture(front) {
            Ok(entry) => {
                self.redo_stack.clear();
                self.push_undo(entry);
                tracing::trace!(depth = self.undo_stack.len(), "canvas snapshot");
            }
            Err(error) => tracing::warn!(%error, "canvas snapshot failed"),
        }
    }

    /// Restores the newest snapshot. Returns `false` when there was nothing to
    /// undo.
    pub fn undo(&mut self, canvas: &mut CanvasBuffers<T>) -> bool {
        let Some(entry) = self.undo_stack.pop_back() else {
            return false;
        };
        match canvas.swap_front(entry) {
            Ok(previous) => {
                self.redo_stack.push(previous);
                true
            }
            Err(_) => {
                tracing::warn!("dropping undo entry that no longer matches the canvas size");
                false
            }
        }
    }

    pub fn redo(&mut self, canvas: &mut CanvasBuffers<T>) -> bool {
        let Some(entry) = self.redo_stack.pop() else {
            return false;
        };
        match canvas.swap_front(entry) {
            Ok(previous) => {
                self.push_undo(previous);
                true
            }
            Err(_) => {
                tracing::warn!("dropping redo entry that no longer matches the canvas size");
                false
            }
        }
    }

    /// Drops the newest undo entry. Used when a gesture that snapshotted
    /// never painted.
    pub fn discard_latest(&mut self) {
        self.undo_stack.pop_back();
    }

    pub fn set_max_undo(&mut self, max_undo: usize) {
        self.max_undo = max_undo;
        self.trim_undo();
        if self.redo_stack.len() > max_undo {
            let excess = self.redo_stack.len() - max_undo;
            self.redo_stack.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, entry: T) {
        self.undo_stack.push_back(entry);
        self.trim_undo();
    }

    fn trim_undo(&mut self) {
        while self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
            tracing::trace!("evicted oldest undo entry");
        }
    }
}
