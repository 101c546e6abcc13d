#![no_main]

//! Fuzz target for registry operations
//!
//! Drives registrations, lookups, layering and overlays from arbitrary
//! input and checks them against a model of which keys are visible where.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use service_injector::{Key, Registry, Service, ServiceKey};
use std::borrow::Cow;
use std::collections::HashMap;

/// Value key whose tag aliases a string key of the same text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Arbitrary)]
struct Tagged(u8);

impl ServiceKey for Tagged {
    fn tag(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Owned(name(self.0)))
    }
}

fn name(id: u8) -> String {
    // Small key space so that collisions are common
    format!("k{}", id % 16)
}

#[derive(Debug, Arbitrary)]
enum RegistryOp {
    SetString { key: u8, value: u32 },
    SetTagged { key: Tagged, value: u32 },
    SetNil { key: u8 },
    Get { key: u8 },
    Contains { key: u8 },
    PushLayer { shadowed: Vec<(u8, u32)> },
    PopLayer,
    Overlay { shadowed: Vec<(u8, u32)>, key: u8 },
}

fuzz_target!(|ops: Vec<RegistryOp>| {
    let root = Registry::new();
    let mut layers = vec![root.clone()];

    // Tags visible in the root; every write lands there
    let mut root_tags: HashMap<String, Option<u32>> = HashMap::new();

    for op in ops.into_iter().take(256) {
        let Some(top) = layers.last().cloned() else {
            break;
        };

        match op {
            RegistryOp::SetString { key, value } => {
                let key = name(key);
                let shadowed_locally = layers[1..].iter().any(|layer| {
                    layer
                        .keys()
                        .iter()
                        .any(|k| k.tag().as_deref() == Some(key.as_str()))
                });
                let result = top.set(key.as_str(), value);

                if root_tags.contains_key(&key) || shadowed_locally {
                    assert!(result.is_err());
                } else {
                    assert!(result.is_ok());
                    root_tags.insert(key, Some(value));
                }
            }
            RegistryOp::SetTagged { key, value } => {
                let tag = name(key.0);
                let result = top.set(Key::new(key), value);
                if result.is_ok() {
                    assert!(!root_tags.contains_key(&tag));
                    root_tags.insert(tag, Some(value));
                }
            }
            RegistryOp::SetNil { key } => {
                let key = name(key);
                if top.set_service(key.as_str(), Service::nil()).is_ok() {
                    root_tags.insert(key, None);
                }
            }
            RegistryOp::Get { key } => {
                let key = name(key);
                match root.get(key.as_str()) {
                    Ok(service) => {
                        let expected = root_tags.get(&key).copied().flatten();
                        assert_eq!(service.cloned::<u32>(), expected);
                    }
                    Err(err) => {
                        assert!(err.is_not_found());
                        assert!(!root_tags.contains_key(&key));
                    }
                }
                let _ = top.get(key.as_str());
            }
            RegistryOp::Contains { key } => {
                let key = name(key);
                assert_eq!(root.contains(key.as_str()), root_tags.contains_key(&key));
                if root.contains(key.as_str()) {
                    assert!(top.contains(key.as_str()));
                }
            }
            RegistryOp::PushLayer { shadowed } => {
                let services = shadowed
                    .into_iter()
                    .take(8)
                    .map(|(key, value)| (name(key), Service::new(value)));
                if let Ok(child) = top.with_values(services) {
                    assert_eq!(child.depth() as usize, layers.len());
                    layers.push(child);
                }
            }
            RegistryOp::PopLayer => {
                if layers.len() > 1 {
                    layers.pop();
                }
            }
            RegistryOp::Overlay { shadowed, key } => {
                let shadowed: Vec<_> = shadowed.into_iter().take(8).collect();
                let overlay = top.overlay(
                    shadowed
                        .iter()
                        .map(|(key, value)| (name(*key), Service::new(*value))),
                );

                let key = name(key);
                let expected = shadowed.iter().rev().find(|(k, _)| name(*k) == key);
                match (overlay.get(key.as_str()), expected) {
                    (Ok(service), Some((_, value))) => {
                        assert_eq!(service.cloned::<u32>(), Some(*value));
                    }
                    (Err(_), Some(_)) => panic!("shadowed key must resolve"),
                    (result, None) => assert_eq!(result.is_ok(), top.contains(key.as_str())),
                }
            }
        }
    }
});
