// src/config/constants.rs
//! System-wide configuration constants

/// Recognizer tuning defaults
pub mod recognizer {
    /// Samples per analysis window
    pub const DEFAULT_TEMPLATE_LENGTH: usize = 80;
    /// Buffer capacity, must be at least the template length
    pub const DEFAULT_DETECTION_WINDOW: usize = 100;
    /// Samples between evaluations (250ms @ 20Hz)
    pub const DEFAULT_STEP_SIZE: usize = 5;
    pub const DEFAULT_DTW_THRESHOLD: f64 = 150.0;
    pub const DEFAULT_MIN_ACTIVITY: f64 = 0.08;
    /// Suppression after a detection (2s @ 20Hz)
    pub const DEFAULT_COOLDOWN_SAMPLES: usize = 40;
    pub const DEFAULT_SIMILARITY_MARGIN: f64 = 30.0;

    pub const MIN_TEMPLATE_LENGTH: usize = 2;
    pub const MAX_TEMPLATE_LENGTH: usize = 2048;
    pub const MAX_DETECTION_WINDOW: usize = 8192;
}

/// Sensor layout and plausibility limits
pub mod sensor {
    pub const AXIS_COUNT: usize = 6;
    pub const FEATURE_COUNT: usize = 8;
    pub const SENSOR_COLUMNS: [&str; AXIS_COUNT] =
        ["Gyro_X", "Gyro_Y", "Gyro_Z", "Acc_X", "Acc_Y", "Acc_Z"];
    pub const CSV_HEADER: &str = "Gyro_X,Gyro_Y,Gyro_Z,Acc_X,Acc_Y,Acc_Z";

    /// Gyroscope full scale is typically +-2000 deg/s
    pub const MAX_ABS_GYRO: f64 = 2500.0;
    /// Accelerometer full scale is typically +-16g
    pub const MAX_ABS_ACCEL: f64 = 200.0;

    /// Standard deviations at or below this are treated as zero
    pub const ZERO_VARIANCE_EPSILON: f64 = 1e-12;
}

/// Serial transport constants
pub mod serial {
    pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
    pub const DEFAULT_BAUD_RATE: u32 = 115200;
    pub const MIN_BAUD_RATE: u32 = 9600;
    pub const MAX_BAUD_RATE: u32 = 4_000_000;
    /// Boards reset when the port opens
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;
    pub const DEFAULT_SKIP_INITIAL_LINES: usize = 1;
    pub const DEFAULT_IDLE_SLEEP_MS: u64 = 1;
    pub const MAX_IDLE_SLEEP_MS: u64 = 1000;
    pub const MAX_LINE_BYTES: usize = 4096;
}

/// Detection event delivery
pub mod events {
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
    pub const DEFAULT_HISTORY_CAPACITY: usize = 256;
    pub const MAX_CHANNEL_CAPACITY: usize = 65536;
}

/// Template storage
pub mod templates {
    pub const DEFAULT_TEMPLATES_DIR: &str = "gesture_models";
    pub const TEMPLATE_EXTENSION: &str = "json";
    /// Builder adds a centered variant when this many template lengths are available
    pub const SECOND_VARIANT_MIN_LENGTHS: usize = 3;
}

/// File system paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/imu-gesture/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/imu-gesture";
    pub const LOCAL_CONFIG_FILE: &str = "config.toml";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const ENV_PREFIX: &str = "GESTURE_";
    pub const ENV_SECTION_SEPARATOR: &str = "__";
}

/// Testing constants
pub mod testing {
    pub const TEST_TEMPLATE_LENGTH: usize = 20;
    pub const TEST_DETECTION_WINDOW: usize = 30;
    pub const TEST_STEP_SIZE: usize = 1;
    pub const TEST_COOLDOWN_SAMPLES: usize = 10;
    pub const TEST_SIGNAL_AMPLITUDE: f64 = 1.5;
}
