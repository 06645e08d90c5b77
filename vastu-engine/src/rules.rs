//! 规则集输入：由规则抽取步骤产出的 JSON/TOML，视为不可信输入。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::LayoutError;
use crate::model::{CompassZone, RoomCategory, RoomRequirement, ZonePreference, validate_requirements};

/// 标称尺寸换算最小/最大尺寸的系数。
const SIZE_MIN_FACTOR: f64 = 0.8;
const SIZE_MAX_FACTOR: f64 = 1.2;

/// 规则集中的单个房间。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomRule {
    pub room: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub allowed_quadrants: Vec<String>,
    /// 与 `allowed_quadrants` 一一对应的合规权重。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<Vec<f64>>,
    #[serde(default)]
    pub forbidden: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_area: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_area: Option<f64>,
    /// 标称宽×深；未给出面积时按 0.8/1.2 倍换算面积范围。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<[f64; 2]>,
    #[serde(default)]
    pub must_touch: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default)]
    pub entrance: bool,
}

/// 规则集：严格度与房间规则列表。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strictness: Option<f64>,
    #[serde(default)]
    pub rooms: Vec<RoomRule>,
}

fn parse_failure(format: &str, err: impl std::fmt::Display) -> LayoutError {
    LayoutError::InvalidRequirement {
        room: "<rule set>".to_string(),
        reason: format!("malformed {format}: {err}"),
    }
}

impl RuleSet {
    pub fn from_json(text: &str) -> Result<Self, LayoutError> {
        serde_json::from_str(text).map_err(|err| parse_failure("JSON", err))
    }

    pub fn from_toml(text: &str) -> Result<Self, LayoutError> {
        toml::from_str(text).map_err(|err| parse_failure("TOML", err))
    }

    /// 校验严格度范围并返回。
    pub fn strictness(&self) -> Result<Option<f64>, LayoutError> {
        match self.strictness {
            Some(value) if !(0.0..=1.0).contains(&value) => Err(LayoutError::InvalidRequirement {
                room: "<rule set>".to_string(),
                reason: format!("strictness must be within [0, 1], got {value}"),
            }),
            other => Ok(other),
        }
    }

    /// 转换为布局需求：推断类别、套用默认方位并整体校验。
    pub fn into_requirements(self) -> Result<Vec<RoomRequirement>, LayoutError> {
        self.strictness()?;
        let requirements = self
            .rooms
            .into_iter()
            .map(RoomRule::into_requirement)
            .collect::<Result<Vec<_>, _>>()?;
        validate_requirements(&requirements)?;
        Ok(requirements)
    }
}

impl RoomRule {
    pub fn into_requirement(self) -> Result<RoomRequirement, LayoutError> {
        let name = self.room.trim().to_string();
        let fail = |reason: String| LayoutError::invalid_requirement(&name, reason);

        let category = match &self.category {
            Some(label) => RoomCategory::parse(label)
                .ok_or_else(|| fail(format!("unknown category `{label}`")))?,
            None => RoomCategory::infer(&name),
        };

        let parse_zones = |labels: &[String]| -> Result<Vec<CompassZone>, LayoutError> {
            labels
                .iter()
                .map(|label| label.parse::<CompassZone>().map_err(|err| fail(err.to_string())))
                .collect()
        };
        let mut allowed = parse_zones(&self.allowed_quadrants)?;
        let mut forbidden = parse_zones(&self.forbidden)?;

        let weights = match self.weights {
            Some(weights) if weights.len() != allowed.len() => {
                return Err(fail(format!(
                    "{} weights given for {} zones",
                    weights.len(),
                    allowed.len()
                )));
            }
            Some(weights) => weights.into_iter().map(Some).collect(),
            None => vec![None; allowed.len()],
        };

        if allowed.is_empty() {
            allowed = category.default_zones().to_vec();
            if forbidden.is_empty() {
                forbidden = category.default_exclusions().to_vec();
            }
            debug!(room = %name, category = ?category, zones = ?allowed, "套用默认方位规则");
        }
        let weights = if weights.len() == allowed.len() {
            weights
        } else {
            vec![None; allowed.len()]
        };

        let nominal = match self.size {
            Some([width, depth]) if width > 0.0 && depth > 0.0 => Some(width * depth),
            Some([width, depth]) => {
                return Err(fail(format!("size {width}×{depth} must be positive")));
            }
            None => None,
        };
        let min_area = self
            .min_area
            .or(nominal.map(|area| area * SIZE_MIN_FACTOR * SIZE_MIN_FACTOR))
            .ok_or_else(|| fail("either min_area or size is required".to_string()))?;
        let max_area = self
            .max_area
            .or(nominal.map(|area| area * SIZE_MAX_FACTOR * SIZE_MAX_FACTOR));

        let mut requirement = RoomRequirement::new(name.clone(), category, min_area);
        requirement.preferred_zones = allowed
            .into_iter()
            .zip(weights)
            .map(|(zone, weight)| ZonePreference { zone, weight })
            .collect();
        requirement.excluded_zones = forbidden;
        requirement.max_area = max_area;
        if let Some([min, max]) = self.aspect {
            requirement.min_aspect = min;
            requirement.max_aspect = Some(max);
        }
        requirement.adjacent_to = self.must_touch;
        if let Some(priority) = self.priority {
            requirement.priority = priority;
        }
        requirement.is_entrance = self.entrance || category == RoomCategory::Entrance;
        requirement.validate()?;
        Ok(requirement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KITCHEN_RULES: &str = r#"{
        "strictness": 0.6,
        "rooms": [
            {
                "room": "Kitchen",
                "category": "kitchen",
                "allowed_quadrants": ["SE"],
                "forbidden": ["NE"],
                "min_area": 9.0,
                "max_area": 12.0,
                "aspect": [1.0, 1.8],
                "must_touch": ["Dining"],
                "priority": 1
            },
            { "room": "Dining", "allowed_quadrants": ["W", "E"], "min_area": 8.0 }
        ]
    }"#;

    #[test]
    fn json_rules_become_requirements() {
        let rules = RuleSet::from_json(KITCHEN_RULES).expect("规则集应可解析");
        assert_eq!(rules.strictness().expect("严格度合法"), Some(0.6));
        let requirements = rules.into_requirements().expect("规则应可转换");
        assert_eq!(requirements.len(), 2);

        let kitchen = &requirements[0];
        assert_eq!(kitchen.category, RoomCategory::Kitchen);
        assert_eq!(kitchen.preferred_zones[0].zone, CompassZone::SouthEast);
        assert_eq!(kitchen.excluded_zones, vec![CompassZone::NorthEast]);
        assert_eq!(kitchen.max_area, Some(12.0));
        assert_eq!(kitchen.max_aspect, Some(1.8));
        assert_eq!(kitchen.adjacent_to, vec!["Dining".to_string()]);
        assert_eq!(kitchen.priority, 1);

        let dining = &requirements[1];
        assert_eq!(dining.category, RoomCategory::Dining);
        assert_eq!(dining.priority, RoomRequirement::DEFAULT_PRIORITY);
    }

    #[test]
    fn rooms_without_zones_use_the_rulebook() {
        let toml = r#"
            [[rooms]]
            room = "Master Bed"
            size = [4.0, 4.5]

            [[rooms]]
            room = "Guest Toilet"
            min_area = 3.0
        "#;
        let requirements = RuleSet::from_toml(toml)
            .expect("TOML 规则集应可解析")
            .into_requirements()
            .expect("规则应可转换");

        let master = &requirements[0];
        assert_eq!(master.category, RoomCategory::MasterBedroom);
        assert_eq!(master.preferred_zones[0].zone, CompassZone::SouthWest);
        assert!((master.min_area - 18.0 * 0.64).abs() < 1e-9);
        assert!((master.max_area.expect("由标称尺寸推出") - 18.0 * 1.44).abs() < 1e-9);

        let toilet = &requirements[1];
        assert_eq!(toilet.category, RoomCategory::Toilet);
        assert_eq!(toilet.preferred_zones[0].zone, CompassZone::NorthWest);
        assert!(toilet.excluded_zones.contains(&CompassZone::NorthEast));
    }

    #[test]
    fn untrusted_values_are_rejected() {
        let cases = [
            r#"{"rooms": [{"room": "Kitchen", "allowed_quadrants": ["UP"], "min_area": 9}]}"#,
            r#"{"rooms": [{"room": "Kitchen", "min_area": -4}]}"#,
            r#"{"rooms": [{"room": "Kitchen"}]}"#,
            r#"{"rooms": [{"room": "Kitchen", "min_area": 9, "aspect": [2.0, 1.5]}]}"#,
            r#"{"rooms": [{"room": "Kitchen", "min_area": 9, "category": "ballroom"}]}"#,
            r#"{"rooms": [{"room": "Kitchen", "min_area": 9, "must_touch": ["Dining"]}]}"#,
            r#"{"rooms": [{"room": "Kitchen", "allowed_quadrants": ["SE"], "weights": [0.5, 0.2], "min_area": 9}]}"#,
            r#"{"strictness": 1.5, "rooms": []}"#,
            r#"{"rooms": [{"room": "Kitchen", "min_area": 9, "colour": "red"}]}"#,
        ];
        for case in cases {
            let result = RuleSet::from_json(case).and_then(RuleSet::into_requirements);
            assert!(
                matches!(result, Err(LayoutError::InvalidRequirement { .. })),
                "应拒绝: {case}"
            );
        }
    }

    #[test]
    fn explicit_weights_are_kept() {
        let json = r#"{"rooms": [{"room": "Pooja", "allowed_quadrants": ["NE", "E"], "weights": [1.0, 0.6], "min_area": 2}]}"#;
        let requirements = RuleSet::from_json(json)
            .and_then(RuleSet::into_requirements)
            .expect("带权重的规则应可转换");
        assert_eq!(requirements[0].preferred_zones[1].weight, Some(0.6));
    }
}
