/// Reward/penalty scoring for nucleotide searches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NuclScoring {
    pub reward: i32,
    /// Mismatch penalty, given as a negative number
    pub penalty: i32,
    /// Gap costs of the gapped aligner (0/0 = linear default of the table)
    pub gap_open: i32,
    pub gap_extend: i32,
}

impl NuclScoring {
    pub fn new(reward: i32, penalty: i32) -> Self {
        Self {
            reward,
            penalty,
            gap_open: 0,
            gap_extend: 0,
        }
    }

    pub fn with_gaps(mut self, gap_open: i32, gap_extend: i32) -> Self {
        self.gap_open = gap_open;
        self.gap_extend = gap_extend;
        self
    }

    /// Schemes whose alignment scores are always even; odd scores produced by
    /// ambiguity rescoring are rounded down before statistics.
    pub fn requires_even_scores(&self) -> bool {
        matches!(
            (self.reward, self.penalty.abs()),
            (2, 7) | (2, 5) | (2, 3) | (3, 4)
        )
    }
}

impl Default for NuclScoring {
    fn default() -> Self {
        Self::new(1, -3)
    }
}

impl std::str::FromStr for NuclScoring {
    type Err = String;

    /// Parses `reward,penalty`, e.g. `2,-3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (reward, penalty) = s
            .split_once(',')
            .ok_or_else(|| format!("Expected 'reward,penalty', got '{}'", s))?;
        let reward = reward
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("Invalid reward '{}': {}", reward, e))?;
        let penalty = penalty
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("Invalid penalty '{}': {}", penalty, e))?;
        if reward <= 0 || penalty >= 0 {
            return Err(format!(
                "Reward must be positive and penalty negative, got {},{}",
                reward, penalty
            ));
        }
        Ok(Self::new(reward, penalty))
    }
}
