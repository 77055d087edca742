use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlatformId(pub String);

/// A target platform a product is offered on. A selection always binds to
/// exactly one platform; platform groups are the independent unit of checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Platform {
    pub id: PlatformId,
    pub name: String,
    #[serde(default)]
    pub has_sub_platforms: bool,
}

impl Platform {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: PlatformId(id.into()), name: name.into(), has_sub_platforms: false }
    }
}
