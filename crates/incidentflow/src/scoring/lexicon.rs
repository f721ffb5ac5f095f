//! Fixed word tables and the modifier-aware lexicon walk shared by both scorers.

use std::collections::{HashMap, HashSet};

use crate::model::ProcessGroup;

pub const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("resolved", 0.8),
    ("fixed", 0.7),
    ("successful", 0.8),
    ("completed", 0.7),
    ("good", 0.5),
    ("excellent", 0.9),
    ("perfect", 0.9),
    ("great", 0.7),
    ("awesome", 0.8),
    ("fantastic", 0.8),
    ("wonderful", 0.7),
    ("amazing", 0.8),
    ("outstanding", 0.9),
    ("superb", 0.8),
    ("brilliant", 0.8),
    ("effective", 0.6),
    ("efficient", 0.6),
    ("quick", 0.5),
    ("fast", 0.5),
    ("smooth", 0.6),
    ("stable", 0.6),
    ("reliable", 0.7),
    ("satisfied", 0.6),
    ("happy", 0.6),
    ("pleased", 0.6),
    ("impressed", 0.7),
];

pub const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("failed", -0.8),
    ("error", -0.6),
    ("broken", -0.7),
    ("issue", -0.5),
    ("problem", -0.6),
    ("bug", -0.6),
    ("crash", -0.8),
    ("down", -0.7),
    ("offline", -0.7),
    ("unavailable", -0.7),
    ("slow", -0.5),
    ("timeout", -0.6),
    ("freeze", -0.6),
    ("hang", -0.6),
    ("stuck", -0.6),
    ("bad", -0.5),
    ("terrible", -0.9),
    ("awful", -0.8),
    ("horrible", -0.8),
    ("worst", -0.9),
    ("hate", -0.8),
    ("frustrated", -0.7),
    ("annoyed", -0.6),
    ("angry", -0.7),
    ("upset", -0.6),
    ("disappointed", -0.7),
    ("confused", -0.5),
    ("lost", -0.5),
    ("critical", -0.8),
    ("urgent", -0.6),
    ("emergency", -0.8),
    ("outage", -0.8),
    ("failure", -0.7),
    ("malfunction", -0.7),
    ("defect", -0.6),
    ("fault", -0.6),
];

/// Words suggesting a scripted fix.
pub const AUTOMATION_KEYWORDS: &[(&str, f64)] = &[
    ("restart", 0.8),
    ("reboot", 0.8),
    ("reset", 0.7),
    ("clear", 0.6),
    ("flush", 0.6),
    ("refresh", 0.5),
    ("reload", 0.6),
    ("recycle", 0.7),
    ("bounce", 0.7),
    ("kill", 0.6),
    ("stop", 0.5),
    ("start", 0.5),
    ("enable", 0.5),
    ("disable", 0.5),
    ("toggle", 0.6),
    ("switch", 0.4),
    ("patch", 0.3),
    ("install", 0.3),
    ("uninstall", 0.4),
    ("configure", 0.3),
    ("script", 0.7),
    ("automated", 0.9),
    ("automatic", 0.8),
    ("batch", 0.6),
    ("scheduled", 0.7),
    ("routine", 0.6),
    ("standard", 0.5),
    ("procedure", 0.4),
    ("process", 0.3),
    ("workflow", 0.5),
    ("template", 0.4),
    ("policy", 0.3),
    ("rule", 0.4),
    ("trigger", 0.6),
    ("monitor", 0.4),
    ("alert", 0.3),
    ("notification", 0.3),
    ("backup", 0.6),
    ("restore", 0.5),
    ("sync", 0.5),
    ("synchronize", 0.5),
    ("deploy", 0.4),
    ("deployment", 0.4),
    ("provision", 0.5),
    ("cleanup", 0.6),
    ("maintenance", 0.4),
    ("housekeeping", 0.5),
];

/// Words suggesting human investigation or coordination.
pub const MANUAL_KEYWORDS: &[(&str, f64)] = &[
    ("investigate", -0.7),
    ("analyze", -0.6),
    ("research", -0.7),
    ("troubleshoot", -0.8),
    ("debug", -0.7),
    ("diagnose", -0.8),
    ("examine", -0.6),
    ("review", -0.5),
    ("inspect", -0.6),
    ("check", -0.4),
    ("verify", -0.4),
    ("validate", -0.4),
    ("test", -0.3),
    ("escalate", -0.9),
    ("escalation", -0.9),
    ("contact", -0.6),
    ("call", -0.7),
    ("email", -0.5),
    ("notify", -0.4),
    ("inform", -0.4),
    ("discuss", -0.6),
    ("meeting", -0.7),
    ("conference", -0.7),
    ("coordinate", -0.6),
    ("collaborate", -0.5),
    ("consult", -0.6),
    ("approve", -0.6),
    ("approval", -0.6),
    ("authorize", -0.6),
    ("permission", -0.5),
    ("manual", -0.8),
    ("manually", -0.8),
    ("custom", -0.5),
    ("customize", -0.6),
    ("personalize", -0.5),
    ("tailor", -0.5),
    ("modify", -0.4),
    ("change", -0.3),
    ("alter", -0.4),
    ("adjust", -0.4),
    ("tweak", -0.5),
    ("fine-tune", -0.6),
    ("complex", -0.6),
    ("complicated", -0.7),
    ("difficult", -0.6),
    ("challenging", -0.6),
    ("unique", -0.5),
    ("special", -0.4),
    ("exception", -0.7),
    ("unusual", -0.6),
    ("rare", -0.6),
    ("one-off", -0.8),
    ("ad-hoc", -0.7),
];

pub const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("really", 1.3),
    ("quite", 1.2),
    ("totally", 1.8),
    ("completely", 1.8),
    ("absolutely", 2.0),
    ("incredibly", 1.8),
    ("amazingly", 1.7),
    ("seriously", 1.5),
    ("definitely", 1.4),
    ("certainly", 1.3),
    ("particularly", 1.3),
    ("especially", 1.4),
    ("highly", 1.4),
    ("severely", 1.6),
    ("critically", 1.8),
    ("urgently", 1.5),
];

pub const NEGATORS: &[&str] = &[
    "not", "no", "never", "nothing", "nobody", "nowhere", "neither", "nor", "none", "without",
    "lack", "missing", "absent", "unable", "cannot", "can't", "won't", "don't", "doesn't",
    "didn't", "isn't", "aren't", "wasn't", "weren't", "hasn't", "haven't", "hadn't",
];

/// Keywords per process group, matched on word boundaries.
pub fn group_keywords(group: ProcessGroup) -> &'static [&'static str] {
    match group {
        ProcessGroup::Infrastructure => &[
            "server",
            "servers",
            "infrastructure",
            "network",
            "networking",
            "hardware",
            "storage",
            "database",
            "db",
            "system",
            "systems",
            "platform",
            "cloud",
            "vm",
            "virtual",
            "container",
            "docker",
            "kubernetes",
            "k8s",
            "load balancer",
            "firewall",
            "router",
            "switch",
            "dns",
            "dhcp",
            "web server",
            "application server",
            "mysql",
            "postgresql",
            "oracle",
            "restart",
            "reboot",
            "memory",
            "cpu",
            "disk",
            "performance",
        ],
        ProcessGroup::ApplicationSupport => &[
            "application",
            "app",
            "software",
            "program",
            "service",
            "web",
            "website",
            "portal",
            "interface",
            "ui",
            "frontend",
            "backend",
            "api",
            "microservice",
            "middleware",
            "integration",
            "connector",
            "plugin",
            "module",
            "component",
            "library",
            "framework",
        ],
        ProcessGroup::Security => &[
            "security",
            "authentication",
            "authorization",
            "access",
            "permission",
            "certificate",
            "ssl",
            "tls",
            "encryption",
            "decrypt",
            "password",
            "credential",
            "token",
            "key",
            "vulnerability",
            "patch",
            "antivirus",
            "firewall",
            "intrusion",
            "malware",
            "virus",
            "threat",
            "breach",
            "reset",
            "account",
            "login",
            "logout",
            "active directory",
            "ad",
            "identity",
            "policy",
            "compliance",
            "audit",
            "ldap",
        ],
        ProcessGroup::Monitoring => &[
            "monitoring",
            "monitor",
            "alert",
            "notification",
            "alarm",
            "dashboard",
            "metric",
            "log",
            "logging",
            "audit",
            "report",
            "analytics",
            "performance",
            "capacity",
            "utilization",
            "threshold",
            "baseline",
            "trend",
            "anomaly",
            "health",
            "status",
            "availability",
            "uptime",
        ],
        ProcessGroup::BackupRecovery => &[
            "backup",
            "restore",
            "recovery",
            "disaster",
            "failover",
            "replication",
            "snapshot",
            "archive",
            "retention",
            "rpo",
            "rto",
            "continuity",
            "sync",
            "synchronization",
            "mirror",
            "clone",
            "copy",
            "dump",
        ],
        ProcessGroup::ChangeManagement => &[
            "change",
            "deployment",
            "deploy",
            "release",
            "rollback",
            "rollout",
            "update",
            "upgrade",
            "patch",
            "install",
            "uninstall",
            "configure",
            "configuration",
            "setup",
            "migration",
            "maintenance",
            "schedule",
        ],
        ProcessGroup::UserSupport => &[
            "user",
            "users",
            "account",
            "profile",
            "login",
            "logout",
            "session",
            "desktop",
            "laptop",
            "mobile",
            "device",
            "printer",
            "email",
            "office",
            "productivity",
            "training",
            "onboarding",
            "offboarding",
            "helpdesk",
            "support",
            "ticket",
            "request",
            "issue",
            "problem",
        ],
        ProcessGroup::NetworkOperations => &[
            "network",
            "connectivity",
            "connection",
            "bandwidth",
            "latency",
            "routing",
            "switching",
            "vlan",
            "subnet",
            "ip",
            "tcp",
            "udp",
            "port",
            "protocol",
            "vpn",
            "wan",
            "lan",
            "wifi",
            "wireless",
        ],
    }
}

/// Sum and count of lexicon hits from one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WalkTotals {
    pub total: f64,
    pub hits: usize,
}

impl WalkTotals {
    pub fn mean(&self) -> Option<f64> {
        (self.hits > 0).then(|| self.total / self.hits as f64)
    }
}

/// A signed word lexicon plus the shared intensifier and negator tables.
#[derive(Debug, Clone)]
pub struct Lexicon {
    weights: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
    negators: HashSet<&'static str>,
}

impl Lexicon {
    pub fn new(tables: &[&[(&'static str, f64)]]) -> Self {
        Self {
            weights: tables.iter().flat_map(|t| t.iter().copied()).collect(),
            intensifiers: INTENSIFIERS.iter().copied().collect(),
            negators: NEGATORS.iter().copied().collect(),
        }
    }

    pub fn sentiment() -> Self {
        Self::new(&[POSITIVE_WORDS, NEGATIVE_WORDS])
    }

    pub fn automation() -> Self {
        Self::new(&[AUTOMATION_KEYWORDS, MANUAL_KEYWORDS])
    }

    pub fn weight(&self, word: &str) -> Option<f64> {
        self.weights.get(word).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Walks tokens left to right. An intensifier sets the pending multiplier,
    /// a negator sets the pending flip; a lexicon hit consumes both. Any other
    /// token discards whatever modifiers were pending.
    pub fn walk<S: AsRef<str>>(&self, tokens: &[S]) -> WalkTotals {
        let mut totals = WalkTotals::default();
        let mut multiplier = 1.0;
        let mut negated = false;

        for token in tokens {
            let token = token.as_ref();
            if let Some(&intensity) = self.intensifiers.get(token) {
                multiplier = intensity;
                continue;
            }
            if self.negators.contains(token) {
                negated = true;
                continue;
            }
            if let Some(&weight) = self.weights.get(token) {
                let value = weight * multiplier;
                totals.total += if negated { -value } else { value };
                totals.hits += 1;
            }
            multiplier = 1.0;
            negated = false;
        }

        totals
    }
}
