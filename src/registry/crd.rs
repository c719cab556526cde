use serde::{Deserialize, Serialize};

/// Whether a custom resource lives in a namespace or at cluster level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Namespaced,
    Cluster,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    pub storage: bool,
}

/// Schema descriptor of a custom resource a plugin needs installed in the cluster.
///
/// Only the identifying parts are modelled; installing the resource is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomResourceDefinition {
    /// `<plural>.<group>`, e.g. `nodediagnostics.eks.amazonaws.com`.
    pub name: String,
    pub group: String,
    pub kind: String,
    pub plural: String,
    pub scope: Scope,
    pub versions: Vec<CrdVersion>,
}

impl CustomResourceDefinition {
    /// Describes a resource served and stored at a single version.
    pub fn new(
        group: impl Into<String>,
        kind: impl Into<String>,
        plural: impl Into<String>,
        scope: Scope,
        version: impl Into<String>,
    ) -> Self {
        let group = group.into();
        let plural = plural.into();
        Self {
            name: format!("{plural}.{group}"),
            group,
            kind: kind.into(),
            plural,
            scope,
            versions: vec![CrdVersion {
                name: version.into(),
                served: true,
                storage: true,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_name_and_serializes_camel_case() {
        let crd = CustomResourceDefinition::new(
            "eks.amazonaws.com",
            "NodeDiagnostic",
            "nodediagnostics",
            Scope::Cluster,
            "v1alpha1",
        );
        assert_eq!(crd.name, "nodediagnostics.eks.amazonaws.com");

        let json = serde_json::to_value(&crd).unwrap();
        assert_eq!(json["scope"], "Cluster");
        assert_eq!(json["versions"][0]["name"], "v1alpha1");
        assert_eq!(json["versions"][0]["storage"], true);
    }
}
