use serde::{Deserialize, Serialize};

/// Remote record of a proxied message. Only the fields the pipeline reads are
/// modelled; everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxiedMessage {
    /// Host account id of whoever triggered the proxy.
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub member: Option<PkMember>,
    #[serde(default)]
    pub system: Option<PkSystem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PkMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pronouns: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `rrggbb` without a leading `#`
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PkSystem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    /// `rrggbb` without a leading `#`
    #[serde(default)]
    pub color: Option<String>,
}

impl ProxiedMessage {
    pub fn member_color(&self) -> Option<&str> {
        self.member.as_ref().and_then(|member| member.color.as_deref())
    }

    pub fn system_color(&self) -> Option<&str> {
        self.system.as_ref().and_then(|system| system.color.as_deref())
    }
}
