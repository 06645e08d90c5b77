pub mod adjacency;
pub mod model;
pub mod openings;
pub mod optimizer;
pub mod rules;
pub mod zones;

pub mod errors {
    use serde::Serialize;
    use thiserror::Error;

    use crate::model::CompassZone;

    /// 布局阶段的硬失败，出现时不会产出任何布局。
    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum LayoutError {
        #[error("invalid plot: {reason}")]
        InvalidPlot { reason: String },
        #[error("invalid requirement for room `{room}`: {reason}")]
        InvalidRequirement { room: String, reason: String },
        #[error("plot too small: rooms need {required:.2} m² but the plot offers {available:.2} m²")]
        PlotTooSmall { required: f64, available: f64 },
        #[error("no feasible placement for room `{room}`")]
        PlacementInfeasible { room: String },
    }

    impl LayoutError {
        pub(crate) fn invalid_requirement(room: impl Into<String>, reason: impl Into<String>) -> Self {
            LayoutError::InvalidRequirement {
                room: room.into(),
                reason: reason.into(),
            }
        }
    }

    /// 布局成功但未完全满足的约束。
    #[derive(Debug, Clone, PartialEq, Serialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum Diagnostic {
        /// 相邻要求在修复后仍未满足。
        AdjacencyUnsatisfied { room: String, target: String },
        /// 房间被放宽到非首选方位。
        Degraded {
            room: String,
            zone: Option<CompassZone>,
        },
        /// 找不到足够长的墙段开门。
        NoDoorway { room: String },
    }

    impl Diagnostic {
        pub fn room(&self) -> &str {
            match self {
                Diagnostic::AdjacencyUnsatisfied { room, .. }
                | Diagnostic::Degraded { room, .. }
                | Diagnostic::NoDoorway { room } => room,
            }
        }
    }

    impl std::fmt::Display for Diagnostic {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Diagnostic::AdjacencyUnsatisfied { room, target } => {
                    write!(f, "room `{room}` does not touch `{target}`")
                }
                Diagnostic::Degraded {
                    room,
                    zone: Some(zone),
                } => write!(f, "room `{room}` relaxed into zone {zone}"),
                Diagnostic::Degraded { room, zone: None } => {
                    write!(f, "room `{room}` relaxed onto the open plot")
                }
                Diagnostic::NoDoorway { room } => {
                    write!(f, "room `{room}` has no wall long enough for a door")
                }
            }
        }
    }
}

pub use errors::{Diagnostic, LayoutError};
pub use model::{CompassZone, Layout, Plot, RoomCategory, RoomRequirement};
pub use optimizer::LayoutOptimizer;
pub use rules::RuleSet;
