//! The translation-engine contract: the reconciler accumulates accepted
//! (policy, virtual service, gateway) bindings into an [`InitState`] and a
//! [`Translator`] turns the accumulated set into the complete desired set of
//! generated objects.

mod state;
mod translate;

pub use self::state::{FinalState, InitState, PolicyAttachment, TranslationError, Translator};
pub use self::translate::{generated_name, DefaultTranslator, GENERATED_NAME_PREFIX};
