use crate::error::{PlayerError, Result};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

#[derive(Debug)]
pub struct PlaylistQueue {
    order: VecDeque<String>,
    shuffled: bool,
    rng: SmallRng,
}

impl Default for PlaylistQueue {
    fn default() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }
}

impl PlaylistQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            order: VecDeque::new(),
            shuffled: false,
            rng,
        }
    }

    pub fn seed(&mut self, piece_names: Vec<String>, shuffle: bool) {
        self.shuffled = shuffle;
        self.fill(piece_names);
    }

    pub fn reset_and_reshuffle(&mut self, piece_names: Vec<String>) {
        self.fill(piece_names);
    }

    pub fn pop_next(&mut self) -> Result<String> {
        self.order.pop_front().ok_or(PlayerError::EmptyQueue)
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn fill(&mut self, mut piece_names: Vec<String>) {
        if self.shuffled {
            piece_names.shuffle(&mut self.rng);
        }
        self.order = piece_names.into();
    }
}
