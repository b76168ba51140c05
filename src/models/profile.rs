use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use crate::models::step_option::StepOption;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Quick,
    Full,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Quick => f.write_str("quick"),
            Profile::Full => f.write_str("full"),
        }
    }
}

/// Parameters for one HTTP measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpLoad {
    pub connections: usize,
    pub duration_secs: u64,
    pub request_timeout_secs: u64,
    // how long in-flight requests may run past the window
    pub drain_grace_secs: u64,
}

impl HttpLoad {
    pub fn with_connections(self, connections: usize) -> Self {
        HttpLoad { connections, ..self }
    }

    pub fn with_duration(self, duration_secs: u64) -> Self {
        HttpLoad { duration_secs, ..self }
    }
}

/// Parameters for one duplex measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplexLoad {
    pub connections: usize,
    pub duration_secs: u64,
    pub connect_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub message_interval_ms: u64,
}

impl DuplexLoad {
    pub fn with_connections(self, connections: usize) -> Self {
        DuplexLoad { connections, ..self }
    }

    pub fn with_duration(self, duration_secs: u64) -> Self {
        DuplexLoad { duration_secs, ..self }
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HttpPhase {
    pub enabled: bool,
    pub load: HttpLoad,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplexPhase {
    pub enabled: bool,
    pub load: DuplexLoad,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StressPhase {
    pub enabled: bool,
    pub http: StepOption,
    pub duplex: StepOption,
}

/// Everything a run needs besides the target description.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub profile: Profile,
    pub public: HttpPhase,
    pub authenticated: HttpPhase,
    pub duplex: DuplexPhase,
    pub stress: StressPhase,
    pub reports_dir: PathBuf,
    pub show_progress: bool,
    pub keep_awake: bool,
}

impl RunConfig {
    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Quick => {
                let http = HttpLoad {
                    connections: 10,
                    duration_secs: 10,
                    request_timeout_secs: 10,
                    drain_grace_secs: 2,
                };
                RunConfig {
                    profile,
                    public: HttpPhase { enabled: true, load: http },
                    authenticated: HttpPhase { enabled: true, load: http },
                    duplex: DuplexPhase {
                        enabled: true,
                        load: DuplexLoad {
                            connections: 10,
                            duration_secs: 15,
                            connect_delay_ms: 50,
                            connect_timeout_secs: 10,
                            message_interval_ms: 1000,
                        },
                    },
                    stress: StressPhase {
                        enabled: false,
                        http: StepOption { start: 10, increase_step: 10, max: 50, window_secs: 5 },
                        duplex: StepOption {
                            start: 10,
                            increase_step: 10,
                            max: 50,
                            window_secs: 8,
                        },
                    },
                    reports_dir: PathBuf::from("reports"),
                    show_progress: true,
                    keep_awake: false,
                }
            }
            Profile::Full => {
                let http = HttpLoad {
                    connections: 50,
                    duration_secs: 30,
                    request_timeout_secs: 10,
                    drain_grace_secs: 5,
                };
                RunConfig {
                    profile,
                    public: HttpPhase { enabled: true, load: http },
                    authenticated: HttpPhase { enabled: true, load: http.with_connections(25) },
                    duplex: DuplexPhase {
                        enabled: true,
                        load: DuplexLoad {
                            connections: 50,
                            duration_secs: 60,
                            connect_delay_ms: 50,
                            connect_timeout_secs: 10,
                            message_interval_ms: 1000,
                        },
                    },
                    stress: StressPhase {
                        enabled: true,
                        http: StepOption {
                            start: 50,
                            increase_step: 50,
                            max: 500,
                            window_secs: 10,
                        },
                        duplex: StepOption {
                            start: 50,
                            increase_step: 50,
                            max: 300,
                            window_secs: 30,
                        },
                    },
                    reports_dir: PathBuf::from("reports"),
                    show_progress: true,
                    keep_awake: true,
                }
            }
        }
    }
}
