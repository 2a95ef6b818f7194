//! Finding a module whose symbols describe a DRED type.
//!
//! The DRED types are stripped from some public d3d12 pdbs, so the module that
//! *should* describe a type may not. Any module whose private symbols include
//! the d3d12 headers will do, and applications that enable DRED frequently do
//! ship such symbols. We try the likely candidates first and then everything
//! else, in load order.

use tracing::{debug, trace};

use crate::error::{DecodeError, ProviderError, SymbolAttempt};
use crate::options::DecodeOptions;
use crate::provider::LoadedModule;

/// The result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The module whose symbols described the type.
    pub module: String,
    pub value: T,
}

/// Orders candidate modules and tries them until one works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSourceResolver {
    primary: String,
    legacy: String,
}

impl SymbolSourceResolver {
    pub fn new<S: Into<String>, T: Into<String>>(primary: S, legacy: T) -> SymbolSourceResolver {
        SymbolSourceResolver {
            primary: primary.into(),
            legacy: legacy.into(),
        }
    }

    pub fn from_options(options: &DecodeOptions) -> SymbolSourceResolver {
        SymbolSourceResolver::new(options.primary_module.clone(), options.legacy_module.clone())
    }

    /// The modules to try, in order: primary, legacy, then every other loaded
    /// module. The primary and legacy modules are tried even when they don't
    /// show up in `modules`.
    pub fn candidates<'a>(&'a self, modules: &'a [LoadedModule]) -> Vec<&'a str> {
        let mut candidates: Vec<&str> = vec![&self.primary, &self.legacy];
        for module in modules {
            if !candidates
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&module.name))
            {
                candidates.push(&module.name);
            }
        }
        candidates
    }

    /// Call `attempt` with each candidate module until it succeeds.
    ///
    /// If every candidate fails the error lists each module and why it failed.
    pub fn resolve<T, F>(
        &self,
        modules: &[LoadedModule],
        type_name: &str,
        mut attempt: F,
    ) -> Result<Resolved<T>, DecodeError>
    where
        F: FnMut(&str) -> Result<T, ProviderError>,
    {
        let mut attempts = Vec::new();
        for module in self.candidates(modules) {
            match attempt(module) {
                Ok(value) => {
                    debug!("using {} from the symbols of {}", type_name, module);
                    return Ok(Resolved {
                        module: module.to_owned(),
                        value,
                    });
                }
                Err(error) => {
                    trace!("{} not usable from {}: {}", type_name, module, error);
                    attempts.push(SymbolAttempt {
                        module: module.to_owned(),
                        error,
                    });
                }
            }
        }
        Err(DecodeError::SymbolMetadataUnavailable {
            type_name: type_name.to_owned(),
            attempts,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn modules(names: &[&str]) -> Vec<LoadedModule> {
        names.iter().map(|&n| LoadedModule::new(n)).collect()
    }

    fn missing(module: &str) -> ProviderError {
        ProviderError::TypeNotFound {
            module: module.to_owned(),
            type_name: "T".to_owned(),
        }
    }

    #[test]
    fn test_candidate_order() {
        let resolver = SymbolSourceResolver::new("d3d12core", "d3d12");
        let modules = modules(&["app.exe", "D3D12", "ntdll", "d3d12core"]);
        assert_eq!(
            resolver.candidates(&modules),
            vec!["d3d12core", "d3d12", "app.exe", "ntdll"]
        );
    }

    #[test]
    fn test_stops_at_first_hit() {
        let resolver = SymbolSourceResolver::new("d3d12core", "d3d12");
        let modules = modules(&["d3d12core", "d3d12", "app.exe"]);
        let mut tried = Vec::new();
        let resolved = resolver
            .resolve(&modules, "T", |module| {
                tried.push(module.to_owned());
                if module == "d3d12" {
                    Ok(42)
                } else {
                    Err(missing(module))
                }
            })
            .unwrap();
        assert_eq!(
            resolved,
            Resolved {
                module: "d3d12".to_owned(),
                value: 42,
            }
        );
        assert_eq!(tried, vec!["d3d12core", "d3d12"]);
    }

    #[test]
    fn test_falls_back_to_other_modules() {
        let resolver = SymbolSourceResolver::new("d3d12core", "d3d12");
        let modules = modules(&["app.exe", "engine.dll"]);
        let resolved = resolver
            .resolve(&modules, "T", |module| {
                if module == "engine.dll" {
                    Ok(())
                } else {
                    Err(missing(module))
                }
            })
            .unwrap();
        assert_eq!(resolved.module, "engine.dll");
    }

    #[test]
    fn test_all_fail() {
        let resolver = SymbolSourceResolver::new("d3d12core", "d3d12");
        let modules = modules(&["app.exe"]);
        let err = resolver
            .resolve::<(), _>(&modules, "T", |module| Err(missing(module)))
            .unwrap_err();
        match err {
            DecodeError::SymbolMetadataUnavailable {
                type_name,
                attempts,
            } => {
                assert_eq!(type_name, "T");
                let tried: Vec<_> = attempts.iter().map(|a| a.module.as_str()).collect();
                assert_eq!(tried, vec!["d3d12core", "d3d12", "app.exe"]);
                assert_eq!(attempts[2].error, missing("app.exe"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
