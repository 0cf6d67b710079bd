//! Temporal consensus over per-frame observations.
//!
//! Single-frame OCR reads are unreliable. The buffer collects every accepted
//! reading for the item currently in front of the camera and only yields a
//! winner once both conditions hold:
//!
//! 1. at least `required_readings` observations are buffered, and
//! 2. the most frequent token accounts for at least `min_confidence_ratio` of
//!    them.
//!
//! Observations are not partitioned by token; all readings for the current
//! item compete together. A failed resolution leaves the buffer untouched.

use anyhow::{anyhow, Result};
use std::collections::HashMap;

use crate::frame::ImageRegion;
use crate::normalize::Token;

pub const DEFAULT_REQUIRED_READINGS: usize = 2;
pub const DEFAULT_MIN_CONFIDENCE_RATIO: f64 = 0.6;

/// One frame's accepted reading.
#[derive(Clone, Debug)]
pub struct Observation {
    pub token: Token,
    pub image: ImageRegion,
}

impl Observation {
    pub fn new(token: Token, image: ImageRegion) -> Self {
        Self { token, image }
    }
}

/// Winning token with the first image that carried it.
#[derive(Clone, Debug)]
pub struct Consensus {
    pub token: Token,
    pub image: ImageRegion,
    pub votes: usize,
    pub total: usize,
}

impl Consensus {
    pub fn ratio(&self) -> f64 {
        self.votes as f64 / self.total as f64
    }
}

/// Outcome of a resolution attempt.
#[derive(Clone, Debug)]
pub enum Resolution {
    Agreed(Consensus),
    /// Not enough agreement yet. `leader` is the current front-runner, if any.
    NoConsensus {
        leader: Option<Token>,
        ratio: f64,
    },
}

impl Resolution {
    pub fn is_agreed(&self) -> bool {
        matches!(self, Resolution::Agreed(_))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsensusSettings {
    pub required_readings: usize,
    pub min_confidence_ratio: f64,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            required_readings: DEFAULT_REQUIRED_READINGS,
            min_confidence_ratio: DEFAULT_MIN_CONFIDENCE_RATIO,
        }
    }
}

impl ConsensusSettings {
    pub fn validate(&self) -> Result<()> {
        if self.required_readings == 0 {
            return Err(anyhow!("required_readings must be at least 1"));
        }
        if !(self.min_confidence_ratio > 0.0 && self.min_confidence_ratio <= 1.0) {
            return Err(anyhow!(
                "min_confidence_ratio must be in (0, 1], got {}",
                self.min_confidence_ratio
            ));
        }
        Ok(())
    }
}

/// Pending observations for the item currently being scanned.
#[derive(Debug)]
pub struct ConsensusBuffer {
    settings: ConsensusSettings,
    observations: Vec<Observation>,
}

impl Default for ConsensusBuffer {
    fn default() -> Self {
        Self {
            settings: ConsensusSettings::default(),
            observations: Vec::new(),
        }
    }
}

impl ConsensusBuffer {
    pub fn new(settings: ConsensusSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            observations: Vec::new(),
        })
    }

    pub fn settings(&self) -> ConsensusSettings {
        self.settings
    }

    pub fn add(&mut self, observation: Observation) {
        self.observations.push(observation);
    }

    pub fn ready_to_resolve(&self) -> bool {
        self.observations.len() >= self.settings.required_readings
    }

    /// Majority vote with stable first-seen tie-breaking.
    ///
    /// Does not mutate the buffer; the caller clears it after committing.
    pub fn resolve(&self) -> Resolution {
        let total = self.observations.len();
        if total == 0 {
            return Resolution::NoConsensus {
                leader: None,
                ratio: 0.0,
            };
        }

        // token -> (count, index of first occurrence)
        let mut tally: HashMap<&Token, (usize, usize)> = HashMap::new();
        for (idx, obs) in self.observations.iter().enumerate() {
            tally.entry(&obs.token).or_insert((0, idx)).0 += 1;
        }

        let Some((_, &(votes, first_idx))) = tally
            .iter()
            .max_by(|(_, a), (_, b)| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        else {
            return Resolution::NoConsensus {
                leader: None,
                ratio: 0.0,
            };
        };

        let winner = &self.observations[first_idx];
        let ratio = votes as f64 / total as f64;
        if ratio >= self.settings.min_confidence_ratio {
            Resolution::Agreed(Consensus {
                token: winner.token.clone(),
                image: winner.image.clone(),
                votes,
                total,
            })
        } else {
            Resolution::NoConsensus {
                leader: Some(winner.token.clone()),
                ratio,
            }
        }
    }

    pub fn clear(&mut self) {
        self.observations.clear();
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}
