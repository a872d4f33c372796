//! 灵巧手型号与静态关节表

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 产品型号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandProduct {
    /// 16 关节
    #[default]
    ArtusLite,
    /// 6 关节，带 5 个指尖力传感器
    ArtusTalos,
    /// 单关节夹爪（行程 mm）
    ArtusScorpion,
}

impl HandProduct {
    pub fn as_str(self) -> &'static str {
        match self {
            HandProduct::ArtusLite => "artus_lite",
            HandProduct::ArtusTalos => "artus_talos",
            HandProduct::ArtusScorpion => "artus_scorpion",
        }
    }
}

impl fmt::Display for HandProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandProduct {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "artus_lite" | "lite" => Ok(HandProduct::ArtusLite),
            "artus_talos" | "talos" => Ok(HandProduct::ArtusTalos),
            "artus_scorpion" | "scorpion" => Ok(HandProduct::ArtusScorpion),
            other => Err(format!("unknown hand product: {other}")),
        }
    }
}

/// 左右手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    #[default]
    Right,
}

impl HandSide {
    pub fn as_str(self) -> &'static str {
        match self {
            HandSide::Left => "left",
            HandSide::Right => "right",
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(HandSide::Left),
            "right" => Ok(HandSide::Right),
            other => Err(format!("unknown hand side: {other}")),
        }
    }
}

/// 静态关节参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointSpec {
    pub name: &'static str,
    pub min_angle: f32,
    pub max_angle: f32,
    pub default_angle: f32,
    pub rotation_direction: i8,
}

const fn joint(name: &'static str, min_angle: f32, max_angle: f32, rotation_direction: i8) -> JointSpec {
    JointSpec {
        name,
        min_angle,
        max_angle,
        default_angle: 0.0,
        rotation_direction,
    }
}

const LITE_JOINTS: [JointSpec; 16] = [
    joint("thumb_spread", -30.0, 30.0, 1),
    joint("thumb_flex", 0.0, 90.0, 1),
    joint("thumb_d2", 0.0, 90.0, 1),
    joint("thumb_d1", 0.0, 90.0, 1),
    joint("index_spread", -15.0, 15.0, 1),
    joint("index_flex", 0.0, 90.0, 1),
    joint("index_d2", 0.0, 90.0, 1),
    joint("middle_spread", -15.0, 15.0, 1),
    joint("middle_flex", 0.0, 90.0, 1),
    joint("middle_d2", 0.0, 90.0, 1),
    joint("ring_spread", -15.0, 15.0, 1),
    joint("ring_flex", 0.0, 90.0, 1),
    joint("ring_d2", 0.0, 90.0, 1),
    joint("pinky_spread", -15.0, 15.0, 1),
    joint("pinky_flex", 0.0, 90.0, 1),
    joint("pinky_d2", 0.0, 90.0, 1),
];

// 左手拇指外展方向相反，活动范围也更小
const TALOS_LEFT_JOINTS: [JointSpec; 6] = [
    joint("thumb_spread", -30.0, 30.0, -1),
    joint("thumb_flex", 0.0, 90.0, 1),
    joint("index_flex", 0.0, 90.0, 1),
    joint("middle_flex", 0.0, 90.0, 1),
    joint("ring_flex", 0.0, 90.0, 1),
    joint("pinky_flex", 0.0, 90.0, 1),
];

const TALOS_RIGHT_JOINTS: [JointSpec; 6] = [
    joint("thumb_spread", -35.0, 35.0, 1),
    joint("thumb_flex", 0.0, 90.0, 1),
    joint("index_flex", 0.0, 90.0, 1),
    joint("middle_flex", 0.0, 90.0, 1),
    joint("ring_flex", 0.0, 90.0, 1),
    joint("pinky_flex", 0.0, 90.0, 1),
];

const SCORPION_JOINTS: [JointSpec; 1] = [joint("gripper_joint", 0.0, 21.0, 1)];

/// 指尖力传感器：名称 + 在力传感器反馈中的 (x, y, z) 元素序号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceSensorSpec {
    pub name: &'static str,
    pub indices: [usize; 3],
}

const TALOS_SENSORS: [ForceSensorSpec; 5] = [
    ForceSensorSpec {
        name: "thumb",
        indices: [0, 1, 2],
    },
    ForceSensorSpec {
        name: "index",
        indices: [3, 4, 5],
    },
    ForceSensorSpec {
        name: "middle",
        indices: [6, 7, 8],
    },
    ForceSensorSpec {
        name: "ring",
        indices: [9, 10, 11],
    },
    ForceSensorSpec {
        name: "pinky",
        indices: [12, 13, 14],
    },
];

/// 按型号与左右手取关节表（序号即数组下标）
pub fn joint_table(product: HandProduct, side: HandSide) -> &'static [JointSpec] {
    match (product, side) {
        (HandProduct::ArtusLite, _) => &LITE_JOINTS,
        (HandProduct::ArtusTalos, HandSide::Left) => &TALOS_LEFT_JOINTS,
        (HandProduct::ArtusTalos, HandSide::Right) => &TALOS_RIGHT_JOINTS,
        (HandProduct::ArtusScorpion, _) => &SCORPION_JOINTS,
    }
}

pub fn sensor_table(product: HandProduct) -> &'static [ForceSensorSpec] {
    match product {
        HandProduct::ArtusTalos => &TALOS_SENSORS,
        HandProduct::ArtusLite | HandProduct::ArtusScorpion => &[],
    }
}
