// Paths
pub const KO_CACHE_PATH: &str = "/tmp/ko";
pub const LOG_DIR_SUFFIX: &str = ".cache/relkit";

// Pinned tool versions
pub const KO_VERSION: &str = "0.11.2";
pub const GORELEASER_VERSION: &str = "1.10.3";

// Download URL templates
pub const KO_URL_TEMPLATE: &str =
    "https://github.com/google/ko/releases/download/v{version}/ko_{version}_{os}_{arch}{ext}";
pub const GORELEASER_URL_TEMPLATE: &str =
    "https://github.com/goreleaser/goreleaser/releases/download/v{version}/goreleaser_{os}_{arch}{ext}";

// Image defaults
pub const DEFAULT_REGISTRY: &str = "ghcr.io";
pub const DEFAULT_IMAGE_PLATFORM: &str = "linux/amd64";
pub const LATEST_TAG: &str = "latest";

// Version stamping
pub const DEFAULT_VERSION_PACKAGE: &str = "sigs.k8s.io/release-utils/version";
pub const SOURCE_DATE_EPOCH: &str = "SOURCE_DATE_EPOCH";

// relkit vars
pub const RELKIT_GORELEASER_VERSION: &str = "RELKIT_GORELEASER_VERSION";
pub const RELKIT_INSTALL_DIR: &str = "RELKIT_INSTALL_DIR";
pub const RELKIT_KO_VERSION: &str = "RELKIT_KO_VERSION";
pub const RELKIT_LOG_DIR: &str = "RELKIT_LOG_DIR";
pub const RELKIT_REGISTRY: &str = "RELKIT_REGISTRY";
pub const RELKIT_VERSION_PACKAGE: &str = "RELKIT_VERSION_PACKAGE";

// ko vars
pub const KO_DOCKER_REPO: &str = "KO_DOCKER_REPO";
pub const KOCACHE: &str = "KOCACHE";

// Go toolchain vars
pub const LDFLAGS: &str = "LDFLAGS";

// GitHub CI vars
pub const GITHUB_ACTOR: &str = "GITHUB_ACTOR";
pub const GITHUB_REF_NAME: &str = "GITHUB_REF_NAME";
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";

// Cargo vars
pub const CARGO_HOME: &str = "CARGO_HOME";

// Misc
pub const UNKNOWN_VERSION: &str = "unknown";
pub const USER_AGENT: &str = concat!("relkit/", env!("CARGO_PKG_VERSION"));
