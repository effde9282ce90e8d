// ── Device model registry ──
//
// One immutable descriptor per supported switch model: capabilities,
// endpoint templates, and the strategy tags (credential scheme, parser
// family, PoE form layout) that select per-family behavior. The table
// replaces per-model inheritance with plain data.

/// HTTP method for an endpoint template. GET parameters are sent as a
/// query string, POST parameters as a form body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A parameter slot in an endpoint template, resolved against session
/// state when the request is rendered. Referencing unset state is a
/// fail-fast error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateParam {
    /// Fixed literal value.
    Literal(&'static str),
    /// The per-session page hash scraped from the device info page.
    ClientHash,
    /// The current session token (body-token families resend it as a
    /// request parameter on every call).
    SessionToken,
    /// The computed login credential. Only valid in login templates.
    PasswordHash,
}

/// One endpoint the device serves, with the parameters it expects.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    pub method: HttpMethod,
    pub path: &'static str,
    pub params: &'static [(&'static str, TemplateParam)],
}

impl Template {
    const fn get(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            params: &[],
        }
    }

    const fn post(path: &'static str) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            params: &[],
        }
    }

    const fn with_params(mut self, params: &'static [(&'static str, TemplateParam)]) -> Self {
        self.params = params;
        self
    }
}

/// Password-hashing strategy used by the login form. Fixed per model,
/// never inferred at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScheme {
    /// Secret submitted unmodified (no challenge field on the device).
    Plain,
    /// Secret interleaved with the one-time numeric challenge from the
    /// login page, then MD5-digested.
    MergeHash,
    /// Keyed MD5 digest of the secret alone; these devices never expose
    /// a challenge.
    HmacMd5,
}

/// Which page-parser variant understands this model's HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserFamily {
    /// Table-based pages of the first-generation models; counter cells
    /// switch between decimal text and hex hidden inputs by firmware.
    Classic,
    /// Single-page dashboard models with register-half counters.
    Dashboard,
    /// Multi-gig table models served under `/iss/specific/`.
    Emx,
    /// Rackmount models served under `/iss/specific/` with per-port
    /// status blocks and a body session token.
    Iss,
    /// Models that embed all data in JavaScript variables.
    Script,
}

/// One detection predicate evaluated against a candidate login page.
///
/// A model matches when all of its predicates pass, or when its
/// `InfoBannerEquals` predicate passes on its own -- the banner names
/// the exact model and overrides weaker signals.
#[derive(Debug, Clone, Copy)]
pub enum DetectionCheck {
    /// Whether the page carries the hidden challenge field.
    ChallengePresent(bool),
    /// Page title (vendor prefix stripped) is one of these values.
    TitleEquals(&'static [&'static str]),
    /// The info banner div matches one of these values. Strong signal.
    InfoBannerEquals(&'static [&'static str]),
    /// The model name embedded in the first script tag matches.
    ScriptModelEquals(&'static [&'static str]),
}

/// Form payload layout for PoE and LED control posts. The field names
/// and encodings differ between the dashboard and rackmount firmwares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoeForm {
    /// Model has no controllable PoE ports.
    None,
    /// Dashboard firmware: numeric `portID`, power-limit type differs
    /// between the plain and high-power variants.
    Dashboard { limit_type: u8 },
    /// Rackmount firmware: named `NOTSET` placeholders and a bitstring
    /// port selector for power cycling.
    Iss,
}

/// Desired state for a switchable port or LED bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPower {
    On,
    Off,
}

impl PoeForm {
    /// Form fields for enabling/disabling power on one PoE port.
    pub fn switch_form(&self, port: u8, state: PortPower) -> Vec<(String, String)> {
        let admin = if state == PortPower::On { "1" } else { "0" };
        match self {
            Self::None => Vec::new(),
            Self::Dashboard { limit_type } => vec![
                ("ACTION".into(), "Apply".into()),
                ("portID".into(), (port - 1).to_string()),
                ("ADMIN_MODE".into(), admin.into()),
                ("PORT_PRIO".into(), "0".into()),
                ("POW_MOD".into(), "3".into()),
                ("POW_LIMT_TYP".into(), limit_type.to_string()),
                ("DETEC_TYP".into(), "2".into()),
                ("DISCONNECT_TYP".into(), "2".into()),
            ],
            Self::Iss => vec![
                ("TYPE".into(), "submitPoe".into()),
                ("PORT_NO".into(), port.to_string()),
                ("POWER_LIMIT_VALUE".into(), "300".into()),
                ("PRIORITY".into(), "NOTSET".into()),
                ("POWER_MODE".into(), "NOTSET".into()),
                ("POWER_LIMIT_TYPE".into(), "NOTSET".into()),
                ("DETECTION".into(), "NOTSET".into()),
                ("ADMIN_STATE".into(), admin.into()),
                ("DISCONNECT_TYPE".into(), "NOTSET".into()),
            ],
        }
    }

    /// Form fields for power-cycling one PoE port.
    pub fn cycle_form(&self, port: u8, poe_ports: &[u8]) -> Vec<(String, String)> {
        match self {
            Self::None => Vec::new(),
            Self::Dashboard { .. } => vec![
                ("ACTION".into(), "Reset".into()),
                (format!("port{}", port - 1), "checked".into()),
            ],
            Self::Iss => {
                let mut selector = vec![b'0'; poe_ports.len()];
                if let Some(slot) = selector.get_mut(usize::from(port) - 1) {
                    *slot = b'1';
                }
                vec![
                    ("TYPE".into(), "resetPoe".into()),
                    (
                        "PoePort".into(),
                        String::from_utf8(selector).unwrap_or_default(),
                    ),
                ]
            }
        }
    }

    /// Form fields for switching the front panel LEDs.
    pub fn led_form(&self, state: PortPower) -> Vec<(String, String)> {
        match self {
            Self::None | Self::Dashboard { .. } => vec![(
                "portled".into(),
                if state == PortPower::On { "0" } else { "2" }.into(),
            )],
            Self::Iss => vec![(
                "PORT_LED_STATUS".into(),
                if state == PortPower::On { "1" } else { "0" }.into(),
            )],
        }
    }
}

/// Immutable description of one switch model: capabilities, endpoint
/// templates, and strategy tags. Selected once at detection time and
/// never mutated.
#[derive(Debug)]
pub struct ModelDescriptor {
    pub name: &'static str,
    pub ports: usize,
    /// 1-based numbers of the ports that can supply PoE power.
    pub poe_ports: &'static [u8],
    pub poe_max_power_all_ports_w: Option<u32>,
    /// Session cookie names the model is known to set, in preference
    /// order. Body-token models store their token under the first name.
    pub allowed_cookie_names: &'static [&'static str],
    pub scheme: CredentialScheme,
    pub parser: ParserFamily,
    pub checks: &'static [DetectionCheck],
    pub poe_form: PoeForm,
    /// Partially supported models stop the poll cycle after the counter
    /// stage.
    pub supported: bool,

    pub detect: &'static [Template],
    pub login: Template,
    pub logout: &'static [Template],
    pub info: &'static [Template],
    pub status: &'static [Template],
    pub statistics: &'static [Template],
    pub poe_config: &'static [Template],
    pub poe_status: &'static [Template],
    pub poe_switch: &'static [Template],
    pub poe_cycle: &'static [Template],
    pub led: &'static [Template],
    pub reboot: &'static [Template],
}

impl ModelDescriptor {
    /// Whether `port` (1-based) can supply PoE power.
    pub fn is_poe_port(&self, port: u8) -> bool {
        self.poe_ports.contains(&port)
    }

    /// Whether the front panel LEDs can be switched.
    pub fn has_led_switch(&self) -> bool {
        !self.led.is_empty()
    }
}

/// Login-page candidates probed during detection, shared by every
/// model. Ordered by how commonly each path is served.
pub const DETECT_TEMPLATES: &[Template] = &[
    Template::get("/login.cgi"),
    Template::get("/login.htm"),
    Template::get("/"),
];

const HASH_PARAM: &[(&str, TemplateParam)] = &[("hash", TemplateParam::ClientHash)];
const GAMBIT_PARAM: &[(&str, TemplateParam)] = &[("Gambit", TemplateParam::SessionToken)];
const PASSWORD_LOGIN: &[(&str, TemplateParam)] = &[("password", TemplateParam::PasswordHash)];
const HOMEPAGE_LOGIN: &[(&str, TemplateParam)] = &[("LoginPassword", TemplateParam::PasswordHash)];
const SCRIPT_LOGIN: &[(&str, TemplateParam)] = &[
    ("submitId", TemplateParam::Literal("pwdLogin")),
    ("password", TemplateParam::PasswordHash),
    ("submitEnd", TemplateParam::Literal("")),
];

/// All registered model descriptors. Detection evaluates every entry;
/// the set must stay unambiguous (no two models may fully match the
/// same login page).
pub fn registry() -> &'static [ModelDescriptor] {
    &REGISTRY
}

static REGISTRY: [ModelDescriptor; 7] = [
    ModelDescriptor {
        name: "GS108Ev3",
        ports: 8,
        poe_ports: &[],
        poe_max_power_all_ports_w: None,
        allowed_cookie_names: &["GS108SID", "SID"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Classic,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS108Ev3"]),
            DetectionCheck::InfoBannerEquals(&[
                "GS108Ev3 - 8-Port Gigabit ProSAFE Plus Switch",
                "GS108Ev3 - 8-Port Gigabit Ethernet Smart Managed Plus Switch",
            ]),
        ],
        poe_form: PoeForm::None,
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/login.cgi").with_params(PASSWORD_LOGIN),
        logout: &[Template::post("/logout.cgi")],
        info: &[
            Template::get("/switch_info.htm"),
            Template::get("/switch_info.cgi"),
        ],
        status: &[Template::post("/status.htm").with_params(HASH_PARAM)],
        statistics: &[
            Template::post("/portStatistics.cgi").with_params(HASH_PARAM),
            Template::post("/port_statistics.htm").with_params(HASH_PARAM),
        ],
        poe_config: &[],
        poe_status: &[],
        poe_switch: &[],
        poe_cycle: &[],
        led: &[],
        reboot: &[],
    },
    ModelDescriptor {
        name: "GS308E",
        ports: 8,
        poe_ports: &[],
        poe_max_power_all_ports_w: None,
        allowed_cookie_names: &["GS108SID", "SID"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Classic,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS308E"]),
            DetectionCheck::InfoBannerEquals(&[
                "GS308E - 8-Port Gigabit ProSAFE Plus Switch",
                "GS308E - 8-Port Gigabit Ethernet Smart Managed Plus Switch",
            ]),
        ],
        poe_form: PoeForm::None,
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/login.cgi").with_params(PASSWORD_LOGIN),
        logout: &[Template::post("/logout.cgi")],
        info: &[
            Template::get("/switch_info.htm"),
            Template::get("/switch_info.cgi"),
        ],
        status: &[Template::post("/status.htm").with_params(HASH_PARAM)],
        statistics: &[
            Template::post("/portStatistics.cgi").with_params(HASH_PARAM),
            Template::post("/port_statistics.htm").with_params(HASH_PARAM),
        ],
        poe_config: &[],
        poe_status: &[],
        poe_switch: &[],
        poe_cycle: &[],
        led: &[],
        reboot: &[],
    },
    ModelDescriptor {
        name: "GS305EP",
        ports: 5,
        poe_ports: &[1, 2, 3, 4],
        poe_max_power_all_ports_w: Some(63),
        allowed_cookie_names: &["SID"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Dashboard,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS305EP"]),
        ],
        poe_form: PoeForm::Dashboard { limit_type: 2 },
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/login.cgi").with_params(PASSWORD_LOGIN),
        logout: &[Template::post("/logout.cgi")],
        info: &[Template::get("/dashboard.cgi")],
        status: &[Template::get("/dashboard.cgi")],
        statistics: &[Template::get("/portStatistics.cgi")],
        poe_config: &[Template::get("/PoEPortConfig.cgi")],
        poe_status: &[Template::get("/getPoePortStatus.cgi")],
        poe_switch: &[Template::post("/PoEPortConfig.cgi").with_params(HASH_PARAM)],
        poe_cycle: &[Template::post("/PoEPortConfig.cgi").with_params(HASH_PARAM)],
        led: &[Template::post("/port_led.cgi").with_params(HASH_PARAM)],
        reboot: &[],
    },
    ModelDescriptor {
        name: "GS308EP",
        ports: 8,
        poe_ports: &[1, 2, 3, 4, 5, 6, 7, 8],
        poe_max_power_all_ports_w: Some(62),
        allowed_cookie_names: &["SID"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Dashboard,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS308EP"]),
        ],
        poe_form: PoeForm::Dashboard { limit_type: 0 },
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/login.cgi").with_params(PASSWORD_LOGIN),
        logout: &[Template::post("/logout.cgi")],
        info: &[Template::get("/dashboard.cgi")],
        status: &[Template::get("/dashboard.cgi")],
        statistics: &[Template::get("/portStatistics.cgi")],
        poe_config: &[Template::get("/PoEPortConfig.cgi")],
        poe_status: &[Template::get("/getPoePortStatus.cgi")],
        poe_switch: &[Template::post("/PoEPortConfig.cgi").with_params(HASH_PARAM)],
        poe_cycle: &[Template::post("/PoEPortConfig.cgi").with_params(HASH_PARAM)],
        led: &[Template::post("/port_led.cgi").with_params(HASH_PARAM)],
        reboot: &[],
    },
    ModelDescriptor {
        name: "GS316EP",
        ports: 16,
        poe_ports: &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
        poe_max_power_all_ports_w: Some(180),
        allowed_cookie_names: &["gambitCookie"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Iss,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS316EP"]),
        ],
        poe_form: PoeForm::Iss,
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/homepage.html").with_params(HOMEPAGE_LOGIN),
        logout: &[Template::get("/iss/specific/logout.html").with_params(GAMBIT_PARAM)],
        info: &[Template::get("/iss/specific/dashboard.html").with_params(GAMBIT_PARAM)],
        status: &[Template::get("/iss/specific/dashboard.html").with_params(GAMBIT_PARAM)],
        statistics: &[Template::get("/iss/specific/interface_stats.html").with_params(GAMBIT_PARAM)],
        poe_config: &[Template::get("/iss/specific/poePortConf.html").with_params(GAMBIT_PARAM)],
        poe_status: &[Template::get("/iss/specific/poePortStatus.html").with_params(&[
            ("Gambit", TemplateParam::SessionToken),
            ("GetData", TemplateParam::Literal("TRUE")),
        ])],
        poe_switch: &[Template::post("/iss/specific/poePortConf.html").with_params(GAMBIT_PARAM)],
        poe_cycle: &[Template::post("/iss/specific/poePortConf.html").with_params(GAMBIT_PARAM)],
        led: &[Template::post("/iss/specific/leds.html").with_params(GAMBIT_PARAM)],
        reboot: &[],
    },
    ModelDescriptor {
        name: "GS110EMX",
        ports: 10,
        poe_ports: &[],
        poe_max_power_all_ports_w: None,
        allowed_cookie_names: &["gambitCookie"],
        scheme: CredentialScheme::MergeHash,
        parser: ParserFamily::Emx,
        checks: &[
            DetectionCheck::ChallengePresent(true),
            DetectionCheck::TitleEquals(&["GS110EMX"]),
        ],
        poe_form: PoeForm::None,
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/homepage.html").with_params(HOMEPAGE_LOGIN),
        logout: &[Template::get("/iss/specific/logout.html").with_params(GAMBIT_PARAM)],
        info: &[Template::get("/iss/specific/sysInfo.html").with_params(GAMBIT_PARAM)],
        status: &[Template::get("/iss/specific/port_settings.html").with_params(GAMBIT_PARAM)],
        statistics: &[Template::get("/iss/specific/interface_stats.html").with_params(GAMBIT_PARAM)],
        poe_config: &[],
        poe_status: &[],
        poe_switch: &[],
        poe_cycle: &[],
        led: &[],
        reboot: &[],
    },
    ModelDescriptor {
        name: "JGS516PE",
        ports: 16,
        poe_ports: &[],
        poe_max_power_all_ports_w: None,
        allowed_cookie_names: &["SID"],
        scheme: CredentialScheme::HmacMd5,
        parser: ParserFamily::Script,
        checks: &[
            DetectionCheck::ChallengePresent(false),
            DetectionCheck::ScriptModelEquals(&["JGS516PE"]),
        ],
        poe_form: PoeForm::None,
        supported: true,
        detect: DETECT_TEMPLATES,
        login: Template::post("/login.htm").with_params(SCRIPT_LOGIN),
        logout: &[Template::post("/logout.cgi")],
        info: &[Template::get("/config/status_switch_info.htm")],
        status: &[Template::get("/config/status_status.htm")],
        statistics: &[Template::get("/config/monitoring_port_statistics.htm")],
        poe_config: &[],
        poe_status: &[],
        poe_switch: &[],
        poe_cycle: &[],
        led: &[],
        reboot: &[],
    },
];

/// Stable identifier for one physical device: lowercase model name plus
/// the host with dots replaced by underscores.
pub fn unique_id(model: &ModelDescriptor, host: &str) -> String {
    format!("{}_{}", model.name.to_lowercase(), host.replace('.', "_"))
}
