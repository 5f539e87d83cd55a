//! Callback references (component B).
//!
//! A [`CallbackRef`] is an opaque handle into whatever script engine loaded
//! the policy. `sandbox-core` never looks inside it; `sandbox-script` is the
//! only crate that knows how to turn one back into a callable Lua value.

/// Opaque registry handle for a script-side callback function.
///
/// Backed by an `mlua::RegistryKey` in `sandbox-script`; represented here as
/// a plain index so this crate stays engine-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackRef(pub u64);

impl CallbackRef {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}
