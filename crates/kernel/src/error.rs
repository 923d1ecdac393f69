//! Validation errors surfaced to the host.

use mosaic_sdk::types::ModuleClass;
use thiserror::Error;

use crate::navigation::NavigationError;
use crate::registration::RegistrationStatus;
use crate::route::RouteError;

/// Failure of [`Runtime::validate_registrations`](crate::runtime::Runtime::validate_registrations).
///
/// These indicate a broken module set rather than a runtime condition, and
/// are fatal to the application bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Validation ran before every module settled.
    #[error(
        "registrations validated before modules were ready (local: {local}, remote: {remote}); wait for both module classes to be ready"
    )]
    NotReady {
        local: RegistrationStatus,
        remote: RegistrationStatus,
    },

    /// The merged route tree or navigation menus are inconsistent.
    #[error("{}", summary(.routes, .navigation))]
    Invalid {
        routes: Vec<RouteError>,
        navigation: Vec<NavigationError>,
    },
}

impl ValidationError {
    /// The class that was not ready, when validation was refused.
    pub fn pending_class(&self) -> Option<ModuleClass> {
        match self {
            Self::NotReady { local, .. } if *local != RegistrationStatus::Ready => {
                Some(ModuleClass::Local)
            }
            Self::NotReady { .. } => Some(ModuleClass::Remote),
            Self::Invalid { .. } => None,
        }
    }

    pub fn route_errors(&self) -> &[RouteError] {
        match self {
            Self::Invalid { routes, .. } => routes,
            Self::NotReady { .. } => &[],
        }
    }

    pub fn navigation_errors(&self) -> &[NavigationError] {
        match self {
            Self::Invalid { navigation, .. } => navigation,
            Self::NotReady { .. } => &[],
        }
    }
}

fn summary(routes: &[RouteError], navigation: &[NavigationError]) -> String {
    let problems: Vec<String> = routes
        .iter()
        .map(ToString::to_string)
        .chain(navigation.iter().map(ToString::to_string))
        .collect();
    format!(
        "{} registration error(s): {}",
        problems.len(),
        problems.join("; ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lists_every_problem() {
        let err = ValidationError::Invalid {
            routes: vec![RouteError::DuplicateRouteId {
                id: "home".into(),
                modules: vec!["local#0".into(), "remote:shop".into()],
            }],
            navigation: vec![NavigationError::UnresolvedSection {
                menu: "root".into(),
                label: "Orders".into(),
                section: "shop".into(),
                module: "remote:shop".into(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("2 registration error(s)"));
        assert!(msg.contains("'home'"));
        assert!(msg.contains("Orders"));
        assert_eq!(err.route_errors().len(), 1);
        assert_eq!(err.pending_class(), None);
    }

    #[test]
    fn not_ready_names_the_pending_class() {
        let err = ValidationError::NotReady {
            local: RegistrationStatus::Ready,
            remote: RegistrationStatus::Idle,
        };
        assert_eq!(err.pending_class(), Some(ModuleClass::Remote));
        assert!(err.to_string().contains("remote: idle"));
    }
}
