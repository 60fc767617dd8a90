//! Navigation across sibling assets inside the detail drawer.

use api_client::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Ring of previewable asset ids with a single-slot transition lock.
///
/// While a transition runs further navigation is dropped, not queued: the
/// first request wins until [`Carousel::finish_transition`] is called.
#[derive(Debug, Clone, Default)]
pub struct Carousel {
    ids: Vec<String>,
    index: Option<usize>,
    transition: Option<Direction>,
}

impl Carousel {
    /// Build from the siblings visible in the grid, keeping images and PDFs.
    pub fn new(siblings: &[Asset], current_id: &str) -> Self {
        let ids: Vec<String> = siblings
            .iter()
            .filter(|a| a.supports_thumbnail())
            .map(|a| a.id.clone())
            .collect();
        let index = ids.iter().position(|id| id == current_id);
        Self {
            ids,
            index,
            transition: None,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self) -> Option<usize> {
        self.index
    }

    pub fn current(&self) -> Option<&str> {
        self.index.and_then(|i| self.ids.get(i)).map(String::as_str)
    }

    pub fn transition(&self) -> Option<Direction> {
        self.transition
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Whether navigation can lead anywhere from here.
    pub fn can_navigate(&self) -> bool {
        match self.index {
            Some(_) => self.ids.len() > 1,
            None => !self.ids.is_empty(),
        }
    }

    pub fn next(&mut self) -> Option<&str> {
        self.step(Direction::Right)
    }

    pub fn previous(&mut self) -> Option<&str> {
        self.step(Direction::Left)
    }

    fn step(&mut self, direction: Direction) -> Option<&str> {
        if self.transition.is_some() || !self.can_navigate() {
            return None;
        }
        let len = self.ids.len();
        let target = match (self.index, direction) {
            (Some(i), Direction::Right) => (i + 1) % len,
            (Some(i), Direction::Left) => (i + len - 1) % len,
            (None, Direction::Right) => 0,
            (None, Direction::Left) => len - 1,
        };
        self.index = Some(target);
        self.transition = Some(direction);
        self.ids.get(target).map(String::as_str)
    }

    pub fn finish_transition(&mut self) {
        self.transition = None;
    }
}
