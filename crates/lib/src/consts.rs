pub const APP_NAME: &str = "romgen";

/// Optional per-project settings file, looked up at the project root.
pub const SETTINGS_FILENAME: &str = "romgen.json";

/// Environment variable overriding the default project root.
pub const PROJECT_ENV: &str = "ROMGEN_PROJECT";

/// Per-group control file in the grouped input layout.
pub const CONTROL_FILENAME: &str = "config.xml";

/// Version-control ignore file, never treated as a payload.
pub const IGNORE_FILENAME: &str = ".gitignore";

pub const KEY_ROM_ID: &str = "config_rom_id";
pub const KEY_ID: &str = "config_id";
pub const KEY_NAME: &str = "config_name";
pub const KEY_CORE: &str = "config_core";

pub const DEFAULT_INPUT_DIR: &str = "autogen/input";
pub const DEFAULT_OUTPUT_DIR: &str = "autogen/output";
pub const DEFAULT_CONFIG_PATH: &str = "app/src/main/res/values/config.xml";
pub const DEFAULT_STAGING_PATH: &str = "system/rom";
pub const DEFAULT_BACKUP_PATH: &str = ".romgen/config.xml.bak";
pub const DEFAULT_JNI_LIBS_DIR: &str = "app/src/main/jniLibs";

pub const LEGACY_ARTIFACT: &str = "app/build/outputs/apk/release/app-release.apk";
pub const PER_ARCH_ARTIFACT: &str = "app/build/outputs/apk/{arch}/release/app-{arch}-release.apk";

/// Placeholder substituted with the architecture name in artifact templates.
pub const ARCH_PLACEHOLDER: &str = "{arch}";

/// Android ABIs built and shipped for every variant.
pub const ABIS: [&str; 4] = ["arm64-v8a", "armeabi-v7a", "x86", "x86_64"];

pub const LATEST_CORES_URL: &str = "http://buildbot.libretro.com/nightly/android/latest";
