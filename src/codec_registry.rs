//! A codec/plugin registry: load named factories, validate their ABI,
//! dedup by endpoint identity, and order the result by a fixed priority
//! table.
//!
//! Grounded directly on `codec-loader.c`'s `load_a2dp_codecs` family.

pub use crate::error::RegistryError;

/// AVDTP allows 0x3E endpoints; there can never be more codecs than that.
pub const MAX_CODECS: usize = 0x3E;

const EXPECTED_ABI: u32 = 1;

const FACTORY_NAMES: [&str; 5] = ["aac", "aptx", "faststream", "ldac", "sbc"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    Sbc,
    SbcXq,
    Mpeg,
    Aac,
    Aptx,
    AptxHd,
    AptxLl,
    AptxLlDuplex,
    Ldac,
    Faststream,
    FaststreamDuplex,
    Other(u32),
}

const PRIORITY_ORDER: [CodecId; 11] = [
    CodecId::Ldac,
    CodecId::AptxHd,
    CodecId::Aptx,
    CodecId::Aac,
    CodecId::Mpeg,
    CodecId::Sbc,
    CodecId::SbcXq,
    CodecId::Faststream,
    CodecId::FaststreamDuplex,
    CodecId::AptxLl,
    CodecId::AptxLlDuplex,
];

fn priority_rank(id: CodecId) -> usize {
    PRIORITY_ORDER
        .iter()
        .position(|&candidate| candidate == id)
        .unwrap_or(PRIORITY_ORDER.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecDescriptor {
    pub id: CodecId,
    pub name: String,
    pub endpoint_name: Option<String>,
}

impl CodecDescriptor {
    /// The key duplicate detection dedups on: the endpoint name if set,
    /// else the codec name.
    fn identity(&self) -> &str {
        self.endpoint_name.as_deref().unwrap_or(&self.name)
    }
}

/// A loaded plugin: its codec interface, kept alive for as long as any of
/// its codecs are retained in a [`Registry`].
///
/// Dropping the handle is the unload: there is no separate `free` step, a
/// deliberate departure from `codec-loader.c`'s explicit
/// `spa_plugin_loader_unload` — RAII expresses "unload when no longer
/// referenced" more directly than a matching free call would.
pub trait PluginHandle {
    fn interface(&self) -> &dyn CodecInterface;
}

pub trait CodecInterface {
    fn abi_version(&self) -> u32;
    fn codecs(&self) -> &[CodecDescriptor];
}

pub trait PluginLoader {
    /// Load the named factory, or `None` if it isn't available.
    fn load(&self, factory_name: &str) -> Option<Box<dyn PluginHandle>>;
}

/// The assembled set of codecs, sorted by priority, plus the plugin handles
/// backing them.
pub struct Registry {
    codecs: Vec<CodecDescriptor>,
    _handles: Vec<Box<dyn PluginHandle>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("codecs", &self.codecs)
            .finish()
    }
}

impl Registry {
    /// Load every known A2DP codec factory, keep the first of each endpoint
    /// identity, require at least one SBC codec, and order the rest by
    /// priority with ties broken by load/insertion order (not pointer
    /// identity — see `DESIGN.md`).
    pub fn load(loader: &dyn PluginLoader) -> Result<Registry, RegistryError> {
        let mut codecs: Vec<CodecDescriptor> = Vec::new();
        let mut handles: Vec<Box<dyn PluginHandle>> = Vec::new();

        for factory_name in FACTORY_NAMES {
            let handle = match loader.load(factory_name) {
                Some(handle) => handle,
                None => {
                    log::info!("codec plugin {} not available", factory_name);
                    continue;
                }
            };

            let interface = handle.interface();
            if interface.abi_version() != EXPECTED_ABI {
                log::info!(
                    "codec plugin {} has incompatible ABI version ({} != {})",
                    factory_name,
                    interface.abi_version(),
                    EXPECTED_ABI
                );
                continue;
            }

            let mut added = 0usize;
            for codec in interface.codecs() {
                if codecs.len() >= MAX_CODECS {
                    log::error!("too many A2DP codecs");
                    break;
                }
                let duplicate = codecs.iter().any(|c| c.identity() == codec.identity());
                if duplicate {
                    continue;
                }
                codecs.push(codec.clone());
                added += 1;
            }

            if added > 0 {
                handles.push(handle);
            }
        }

        let has_sbc = codecs.iter().any(|c| c.id == CodecId::Sbc);
        if !has_sbc {
            log::error!("failed to load A2DP SBC codec from plugins");
            return Err(RegistryError::NotFound("SBC"));
        }

        codecs.sort_by_key(|c| priority_rank(c.id));

        Ok(Registry {
            codecs,
            _handles: handles,
        })
    }

    pub fn codecs(&self) -> &[CodecDescriptor] {
        &self.codecs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeInterface {
        abi: u32,
        codecs: Vec<CodecDescriptor>,
    }
    impl CodecInterface for FakeInterface {
        fn abi_version(&self) -> u32 {
            self.abi
        }
        fn codecs(&self) -> &[CodecDescriptor] {
            &self.codecs
        }
    }
    struct FakeHandle(FakeInterface);
    impl PluginHandle for FakeHandle {
        fn interface(&self) -> &dyn CodecInterface {
            &self.0
        }
    }

    fn codec(id: CodecId, name: &str) -> CodecDescriptor {
        CodecDescriptor {
            id,
            name: name.to_owned(),
            endpoint_name: None,
        }
    }

    struct FakeLoader {
        plugins: std::collections::HashMap<&'static str, (u32, Vec<CodecDescriptor>)>,
    }
    impl PluginLoader for FakeLoader {
        fn load(&self, factory_name: &str) -> Option<Box<dyn PluginHandle>> {
            self.plugins.get(factory_name).map(|(abi, codecs)| {
                Box::new(FakeHandle(FakeInterface {
                    abi: *abi,
                    codecs: codecs.clone(),
                })) as Box<dyn PluginHandle>
            })
        }
    }

    #[test]
    fn requires_sbc_to_be_present() {
        let loader = FakeLoader {
            plugins: [("aac", (1, vec![codec(CodecId::Aac, "aac")]))]
                .into_iter()
                .collect(),
        };
        let err = Registry::load(&loader).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound("SBC")));
    }

    #[test]
    fn orders_codecs_by_priority_with_stable_ties() {
        let loader = FakeLoader {
            plugins: [
                (
                    "sbc",
                    (
                        1,
                        vec![codec(CodecId::Sbc, "sbc"), codec(CodecId::SbcXq, "sbc-xq")],
                    ),
                ),
                ("aac", (1, vec![codec(CodecId::Aac, "aac")])),
                ("ldac", (1, vec![codec(CodecId::Ldac, "ldac")])),
            ]
            .into_iter()
            .collect(),
        };
        let registry = Registry::load(&loader).unwrap();
        let order: Vec<CodecId> = registry.codecs().iter().map(|c| c.id).collect();
        assert_eq!(
            order,
            vec![CodecId::Ldac, CodecId::Aac, CodecId::Sbc, CodecId::SbcXq]
        );
    }

    #[test]
    fn skips_a_plugin_with_an_incompatible_abi() {
        let loader = FakeLoader {
            plugins: [
                ("sbc", (1, vec![codec(CodecId::Sbc, "sbc")])),
                ("aac", (99, vec![codec(CodecId::Aac, "aac")])),
            ]
            .into_iter()
            .collect(),
        };
        let registry = Registry::load(&loader).unwrap();
        assert!(!registry.codecs().iter().any(|c| c.id == CodecId::Aac));
    }

    #[test]
    fn dedups_by_endpoint_identity() {
        let mut sbc_again = codec(CodecId::Sbc, "sbc");
        sbc_again.id = CodecId::Other(999);
        let loader = FakeLoader {
            plugins: [(
                "sbc",
                (1, vec![codec(CodecId::Sbc, "sbc"), sbc_again]),
            )]
            .into_iter()
            .collect(),
        };
        let registry = Registry::load(&loader).unwrap();
        assert_eq!(registry.codecs().len(), 1);
    }

    proptest::proptest! {
        #[test]
        fn sbc_presence_alone_determines_success(has_sbc: bool) {
            let mut codecs = vec![codec(CodecId::Aac, "aac")];
            if has_sbc {
                codecs.push(codec(CodecId::Sbc, "sbc"));
            }
            let loader = FakeLoader {
                plugins: [("sbc", (1, codecs))].into_iter().collect(),
            };
            let result = Registry::load(&loader);
            proptest::prop_assert_eq!(result.is_ok(), has_sbc);
        }
    }
}
