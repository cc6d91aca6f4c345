//! The five bounded narrative gauges and the delta algebra applied to them.
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CANONITY, DEFAULT_CORRUPTION, DEFAULT_FATE, DEFAULT_SANITY, DEFAULT_TRUST, METER_MAX,
    METER_MIN,
};
use crate::numbers::saturate_i64_to_i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterKind {
    Canonity,
    Corruption,
    Sanity,
    Trust,
    Fate,
}

impl MeterKind {
    /// Display order used by the HUD and by reports.
    pub const ALL: [Self; 5] = [
        Self::Canonity,
        Self::Corruption,
        Self::Sanity,
        Self::Trust,
        Self::Fate,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Canonity => "canonity",
            Self::Corruption => "corruption",
            Self::Sanity => "sanity",
            Self::Trust => "trust",
            Self::Fate => "fate",
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeterKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "canonity" => Ok(Self::Canonity),
            "corruption" => Ok(Self::Corruption),
            "sanity" => Ok(Self::Sanity),
            "trust" => Ok(Self::Trust),
            "fate" => Ok(Self::Fate),
            _ => Err(()),
        }
    }
}

const fn default_canonity() -> i32 {
    DEFAULT_CANONITY
}

const fn default_corruption() -> i32 {
    DEFAULT_CORRUPTION
}

const fn default_sanity() -> i32 {
    DEFAULT_SANITY
}

const fn default_trust() -> i32 {
    DEFAULT_TRUST
}

const fn default_fate() -> i32 {
    DEFAULT_FATE
}

/// Current gauge values. Serialized as the `state` object of the session.
///
/// A key missing from persisted or wire data falls back to that gauge's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meters {
    #[serde(default = "default_canonity")]
    pub canonity: i32,
    #[serde(default = "default_corruption")]
    pub corruption: i32,
    #[serde(default = "default_sanity")]
    pub sanity: i32,
    #[serde(default = "default_trust")]
    pub trust: i32,
    #[serde(default = "default_fate")]
    pub fate: i32,
}

impl Default for Meters {
    fn default() -> Self {
        Self {
            canonity: DEFAULT_CANONITY,
            corruption: DEFAULT_CORRUPTION,
            sanity: DEFAULT_SANITY,
            trust: DEFAULT_TRUST,
            fate: DEFAULT_FATE,
        }
    }
}

impl Meters {
    #[must_use]
    pub const fn get(&self, kind: MeterKind) -> i32 {
        match kind {
            MeterKind::Canonity => self.canonity,
            MeterKind::Corruption => self.corruption,
            MeterKind::Sanity => self.sanity,
            MeterKind::Trust => self.trust,
            MeterKind::Fate => self.fate,
        }
    }

    const fn slot_mut(&mut self, kind: MeterKind) -> &mut i32 {
        match kind {
            MeterKind::Canonity => &mut self.canonity,
            MeterKind::Corruption => &mut self.corruption,
            MeterKind::Sanity => &mut self.sanity,
            MeterKind::Trust => &mut self.trust,
            MeterKind::Fate => &mut self.fate,
        }
    }

    pub fn clamp(&mut self) {
        for kind in MeterKind::ALL {
            let slot = self.slot_mut(kind);
            *slot = (*slot).clamp(METER_MIN, METER_MAX);
        }
    }

    /// Shift one gauge by `amount`, saturating at the gauge bounds.
    pub fn adjust(&mut self, kind: MeterKind, amount: i64) {
        let slot = self.slot_mut(kind);
        let next = i64::from(*slot)
            .saturating_add(amount)
            .clamp(i64::from(METER_MIN), i64::from(METER_MAX));
        *slot = saturate_i64_to_i32(next);
    }

    /// Apply every key of `delta`; absent keys contribute zero.
    pub fn apply(&mut self, delta: &MeterDelta) {
        for kind in MeterKind::ALL {
            self.adjust(kind, delta.get(kind));
        }
    }

    #[must_use]
    pub fn in_range(&self) -> bool {
        MeterKind::ALL
            .iter()
            .all(|kind| (METER_MIN..=METER_MAX).contains(&self.get(*kind)))
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes by reference
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Signed adjustments declared by a choice. Keys the story service omits or
/// sends as `null` are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MeterDelta {
    #[serde(default, deserialize_with = "null_as_zero", skip_serializing_if = "is_zero")]
    pub canonity: i64,
    #[serde(default, deserialize_with = "null_as_zero", skip_serializing_if = "is_zero")]
    pub corruption: i64,
    #[serde(default, deserialize_with = "null_as_zero", skip_serializing_if = "is_zero")]
    pub sanity: i64,
    #[serde(default, deserialize_with = "null_as_zero", skip_serializing_if = "is_zero")]
    pub trust: i64,
    #[serde(default, deserialize_with = "null_as_zero", skip_serializing_if = "is_zero")]
    pub fate: i64,
}

impl MeterDelta {
    #[must_use]
    pub const fn get(&self, kind: MeterKind) -> i64 {
        match kind {
            MeterKind::Canonity => self.canonity,
            MeterKind::Corruption => self.corruption,
            MeterKind::Sanity => self.sanity,
            MeterKind::Trust => self.trust,
            MeterKind::Fate => self.fate,
        }
    }

    #[must_use]
    pub fn with(mut self, kind: MeterKind, amount: i64) -> Self {
        match kind {
            MeterKind::Canonity => self.canonity = amount,
            MeterKind::Corruption => self.corruption = amount,
            MeterKind::Sanity => self.sanity = amount,
            MeterKind::Trust => self.trust = amount,
            MeterKind::Fate => self.fate = amount,
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        MeterKind::ALL.iter().all(|kind| self.get(*kind) == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_new_game_values() {
        let meters = Meters::default();
        assert_eq!(meters.canonity, 5);
        assert_eq!(meters.corruption, 0);
        assert_eq!(meters.sanity, 7);
        assert_eq!(meters.trust, 6);
        assert_eq!(meters.fate, 0);
    }

    #[test]
    fn sequential_deltas_saturate_at_bounds() {
        let mut meters = Meters::default();
        let mut seen = Vec::new();
        for step in [5, 5, -20, 3] {
            meters.apply(&MeterDelta::default().with(MeterKind::Sanity, step));
            seen.push(meters.sanity);
        }
        assert_eq!(seen, vec![10, 10, 0, 3]);
    }

    #[test]
    fn zero_delta_is_idempotent() {
        let mut meters = Meters {
            canonity: 1,
            corruption: 9,
            sanity: 0,
            trust: 10,
            fate: 4,
        };
        let before = meters;
        meters.apply(&MeterDelta::default());
        meters.apply(&MeterDelta::default());
        assert_eq!(meters, before);
    }

    #[test]
    fn extreme_deltas_never_overflow() {
        let mut meters = Meters::default();
        meters.apply(&MeterDelta {
            canonity: i64::MAX,
            corruption: i64::MIN,
            sanity: i64::MAX,
            trust: i64::MIN,
            fate: 3,
        });
        assert_eq!(meters.canonity, 10);
        assert_eq!(meters.corruption, 0);
        assert_eq!(meters.sanity, 10);
        assert_eq!(meters.trust, 0);
        assert_eq!(meters.fate, 3);
        assert!(meters.in_range());
    }

    #[test]
    fn clamp_repairs_out_of_range_values() {
        let mut meters = Meters {
            canonity: -4,
            corruption: 42,
            sanity: 7,
            trust: 11,
            fate: 0,
        };
        assert!(!meters.in_range());
        meters.clamp();
        assert_eq!(meters.canonity, 0);
        assert_eq!(meters.corruption, 10);
        assert_eq!(meters.trust, 10);
        assert!(meters.in_range());
    }

    #[test]
    fn partial_delta_json_defaults_missing_keys() {
        let delta: MeterDelta = serde_json::from_str(r#"{"sanity":-3,"unknown":9}"#).unwrap();
        assert_eq!(delta.sanity, -3);
        assert_eq!(delta.fate, 0);
        assert_eq!(
            serde_json::to_value(delta).unwrap(),
            serde_json::json!({"sanity": -3})
        );
    }

    #[test]
    fn partial_meter_json_uses_per_key_defaults() {
        let meters: Meters = serde_json::from_str(r#"{"fate":2}"#).unwrap();
        assert_eq!(meters.fate, 2);
        assert_eq!(meters.sanity, 7);
        assert_eq!(meters.trust, 6);
    }

    #[test]
    fn meter_kind_parses_and_prints() {
        for kind in MeterKind::ALL {
            assert_eq!(kind.as_str().parse::<MeterKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert!("hp".parse::<MeterKind>().is_err());
    }
}
