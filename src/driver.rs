//! Registration of record mappings with a binary document store driver.
//!
//! A store driver usually keeps its own per-type class maps and a type
//! allowlist for polymorphic values. [`Registrar`] translates each record's
//! resolved binary mapping into a [`ClassMap`] and hands it to the driver
//! once, then registers a single [`Allowlist`] for the whole process.
//!
//! ```rust
//! use flexjson::driver::{Allowlist, ClassMap, Registrar, StoreDriver};
//! use flexjson::{Field, Record, Schema};
//!
//! #[derive(Clone, Default)]
//! struct Note { id: String, body: String }
//!
//! impl Record for Note {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .identity("id", |n: &Note| &n.id, |n: &mut Note| &mut n.id)
//!             .field(Field::new("body", |n: &Note| &n.body, |n: &mut Note| &mut n.body))
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Maps(Vec<ClassMap>);
//!
//! impl StoreDriver for Maps {
//!     fn register_class_map(&mut self, map: ClassMap) -> flexjson::Result<()> {
//!         self.0.push(map);
//!         Ok(())
//!     }
//!
//!     fn register_allowlist(&mut self, _allowlist: Allowlist) -> flexjson::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let ctx = flexjson::Context::default();
//! let mut registrar = Registrar::new(Maps::default(), &ctx);
//! registrar.register::<Note>().unwrap().register::<Note>().unwrap();
//! let maps = registrar.finish().unwrap();
//! assert_eq!(maps.0.len(), 1);
//! assert_eq!(maps.0[0].members[0].key, "_id");
//! ```

use crate::{Context, Ignore, Record, Result, Value, WireFormat};
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

static ALLOWLIST_REGISTERED: AtomicBool = AtomicBool::new(false);

/// Type path prefixes every allowlist accepts.
const DEFAULT_ALLOWED: [&str; 3] = ["std::", "core::", "alloc::"];

/// When a driver should leave a member out of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberPolicy {
    Always,
    IgnoreIfNull,
    IgnoreIfDefault,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberMap {
    pub field: &'static str,
    pub key: String,
    pub identity: bool,
    pub policy: MemberPolicy,
}

/// A record type's binary mapping, in the shape store drivers expect.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap {
    pub type_name: &'static str,
    pub type_id: TypeId,
    /// Stored documents may carry keys no member maps.
    pub ignore_extra_elements: bool,
    pub members: Vec<MemberMap>,
}

impl ClassMap {
    /// Builds the class map of `T` from its resolved binary mapping.
    ///
    /// Members excluded from the binary format are left out. Drivers accept
    /// only one of ignore-if-null and ignore-if-default per member; default
    /// wins since a null value is also a default one.
    pub fn of<T: Record>(ctx: &Context) -> Self {
        let mapping = crate::registry::mapping::<T>(ctx);
        let members = mapping
            .entries(WireFormat::Binary)
            .iter()
            .filter(|entry| {
                mapping.is_identity(entry) || !entry.policy.contains(Ignore::IN_BINARY)
            })
            .map(|entry| MemberMap {
                field: mapping.field_name(entry),
                key: entry.key.clone(),
                identity: mapping.is_identity(entry),
                policy: if entry.policy.contains(Ignore::WHEN_BINARY_DEFAULT) {
                    MemberPolicy::IgnoreIfDefault
                } else if entry.policy.contains(Ignore::WHEN_BINARY_NULL) {
                    MemberPolicy::IgnoreIfNull
                } else {
                    MemberPolicy::Always
                },
            })
            .collect();

        ClassMap {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            ignore_extra_elements: true,
            members,
        }
    }
}

/// Type paths a driver may instantiate when reading polymorphic values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allowlist {
    prefixes: Vec<String>,
}

impl Allowlist {
    /// Allows the standard library plus every crate in `type_names`.
    pub fn from_types<'a>(type_names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut prefixes: Vec<String> = Vec::new();
        for name in type_names {
            let root = match name.find("::") {
                Some(end) => &name[..end + 2],
                None => continue,
            };
            if !prefixes.iter().any(|p| p == root) {
                prefixes.push(root.to_string());
            }
        }
        Allowlist { prefixes }
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    #[must_use]
    pub fn allows(&self, type_name: &str) -> bool {
        DEFAULT_ALLOWED.iter().any(|p| type_name.starts_with(p))
            || !type_name.contains("::")
            || self.prefixes.iter().any(|p| type_name.starts_with(p.as_str()))
    }
}

/// The registration surface of a binary document store driver.
pub trait StoreDriver {
    fn register_class_map(&mut self, map: ClassMap) -> Result<()>;

    fn register_allowlist(&mut self, allowlist: Allowlist) -> Result<()>;
}

/// Registers record types with a [`StoreDriver`], each at most once.
pub struct Registrar<'a, D: StoreDriver> {
    driver: D,
    ctx: &'a Context,
    registered: HashSet<TypeId>,
    types: Vec<&'static str>,
}

impl<'a, D: StoreDriver> Registrar<'a, D> {
    pub fn new(driver: D, ctx: &'a Context) -> Self {
        Registrar {
            driver,
            ctx,
            registered: HashSet::new(),
            types: Vec::new(),
        }
    }

    /// Registers `T`. Repeat registrations are ignored.
    ///
    /// A driver failure is reported as an error event; it only fails the
    /// call when no sink handles that event.
    pub fn register<T: Record>(&mut self) -> Result<&mut Self> {
        let id = TypeId::of::<T>();
        if self.registered.contains(&id) {
            return Ok(self);
        }

        let map = ClassMap::of::<T>(self.ctx);
        match self.driver.register_class_map(map) {
            Ok(()) => {
                self.registered.insert(id);
                self.types.push(std::any::type_name::<T>());
                self.ctx.verbose("Registered record type.", Some(Value::from(T::name())));
            }
            Err(err) => {
                self.ctx.error(
                    "Unable to register a record type with the store driver.",
                    Some(Value::from(err.to_document())),
                )?;
            }
        }
        Ok(self)
    }

    /// Types registered so far.
    #[must_use]
    pub fn registered(&self) -> &[&'static str] {
        &self.types
    }

    /// Registers the process allowlist and returns the driver.
    ///
    /// Only the first call in a process registers an allowlist; later calls
    /// warn and skip it.
    pub fn finish(mut self) -> Result<D> {
        self.ctx.good(
            "Registered records with the store driver.",
            Some(Value::Array(
                self.types.iter().map(|name| Value::from(*name)).collect(),
            )),
        );

        if ALLOWLIST_REGISTERED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.ctx.warn(
                "Already registered a type allowlist; ignoring subsequent calls.",
                None,
            );
            return Ok(self.driver);
        }

        let allowlist = Allowlist::from_types(self.types.iter().copied());
        if let Err(err) = self.driver.register_allowlist(allowlist) {
            ALLOWLIST_REGISTERED.store(false, Ordering::Release);
            self.ctx.error(
                "Unable to register the type allowlist; polymorphic reads may fail.",
                Some(Value::from(err.to_document())),
            )?;
        }
        Ok(self.driver)
    }
}
