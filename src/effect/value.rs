//! Resume payloads.

use serde::{Deserialize, Serialize};

use super::{
    Delivery, EffectTag, Lookup, MessageId, PasswordHash, Record, StoredObject, TokenPair,
    TokenValidation,
};
use crate::healthcare::{Appointment, InteractionCheck, Patient};

/// Every value an interpreter may resume a program with.
///
/// A closed union keeps interpreters free of `Any`: the program side
/// extracts the concrete type through `TryFrom<EffectValue>`, getting the
/// original value back as the error when the shape is wrong.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EffectValue {
    /// Operations that only acknowledge completion.
    Unit,
    /// Result of fetching one record.
    Record(Lookup<Record>),
    /// Result of listing a collection.
    Records(Vec<Record>),
    /// Result of a cache read.
    Cached(Option<serde_json::Value>),
    /// Identifier of a published message.
    MessageId(MessageId),
    /// Next message of a queue, if any.
    Delivery(Option<Delivery>),
    /// Result of an object read.
    Object(Option<StoredObject>),
    /// Keys returned by an object listing.
    ObjectKeys(Vec<String>),
    /// Outcome of token validation.
    TokenValidation(TokenValidation),
    /// Newly issued tokens.
    TokenPair(TokenPair),
    /// Result of hashing a password.
    PasswordHash(PasswordHash),
    /// Whether a password matched its hash.
    PasswordVerification(bool),
    /// Result of fetching a patient.
    Patient(Lookup<Patient>),
    /// Result of fetching an appointment.
    Appointment(Lookup<Appointment>),
    /// Outcome of a drug interaction check.
    InteractionCheck(InteractionCheck),
}

impl EffectValue {
    /// Name of the variant, used in defect reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Record(_) => "record",
            Self::Records(_) => "records",
            Self::Cached(_) => "cached",
            Self::MessageId(_) => "message_id",
            Self::Delivery(_) => "delivery",
            Self::Object(_) => "object",
            Self::ObjectKeys(_) => "object_keys",
            Self::TokenValidation(_) => "token_validation",
            Self::TokenPair(_) => "token_pair",
            Self::PasswordHash(_) => "password_hash",
            Self::PasswordVerification(_) => "password_verification",
            Self::Patient(_) => "patient",
            Self::Appointment(_) => "appointment",
            Self::InteractionCheck(_) => "interaction_check",
        }
    }
}

macro_rules! effect_value_conversions {
    ($($variant:ident($payload:ty)),* $(,)?) => {
        $(
            impl From<$payload> for EffectValue {
                fn from(value: $payload) -> Self {
                    Self::$variant(value)
                }
            }

            impl TryFrom<EffectValue> for $payload {
                type Error = EffectValue;

                fn try_from(value: EffectValue) -> Result<Self, Self::Error> {
                    match value {
                        EffectValue::$variant(payload) => Ok(payload),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

effect_value_conversions! {
    Record(Lookup<Record>),
    Records(Vec<Record>),
    Cached(Option<serde_json::Value>),
    MessageId(MessageId),
    Delivery(Option<Delivery>),
    Object(Option<StoredObject>),
    ObjectKeys(Vec<String>),
    TokenValidation(TokenValidation),
    TokenPair(TokenPair),
    PasswordHash(PasswordHash),
    PasswordVerification(bool),
    Patient(Lookup<Patient>),
    Appointment(Lookup<Appointment>),
    InteractionCheck(InteractionCheck),
}

impl From<()> for EffectValue {
    fn from((): ()) -> Self {
        Self::Unit
    }
}

impl TryFrom<EffectValue> for () {
    type Error = EffectValue;

    fn try_from(value: EffectValue) -> Result<Self, Self::Error> {
        match value {
            EffectValue::Unit => Ok(()),
            other => Err(other),
        }
    }
}

/// A successfully produced value together with the tag of the effect that
/// produced it.
///
/// The tag rides alongside the value so tracing and metrics never need to
/// inspect the value itself.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectReturn<V = EffectValue> {
    tag: EffectTag,
    value: V,
}

impl<V> EffectReturn<V> {
    /// Pairs a value with its originating tag.
    #[must_use]
    pub const fn new(tag: EffectTag, value: V) -> Self {
        Self { tag, value }
    }

    /// Tag of the originating effect.
    #[must_use]
    pub const fn tag(&self) -> EffectTag {
        self.tag
    }

    /// Borrows the value.
    #[must_use]
    pub const fn value(&self) -> &V {
        &self.value
    }

    /// Discards the tag.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Transforms the value, keeping the tag.
    #[must_use]
    pub fn map<U, F>(self, function: F) -> EffectReturn<U>
    where
        F: FnOnce(V) -> U,
    {
        EffectReturn {
            tag: self.tag,
            value: function(self.value),
        }
    }
}

impl<V: Into<EffectValue>> EffectReturn<V> {
    /// Widens a typed return into the closed payload union.
    #[must_use]
    pub fn erase(self) -> EffectReturn {
        self.map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn try_from_extracts_matching_variant() {
        let value = EffectValue::from(true);
        assert_eq!(bool::try_from(value), Ok(true));
    }

    #[rstest]
    fn try_from_returns_value_on_mismatch() {
        let value = EffectValue::ObjectKeys(vec!["a".into()]);
        let error = bool::try_from(value.clone()).unwrap_err();
        assert_eq!(error, value);
        assert_eq!(error.kind(), "object_keys");
    }

    #[rstest]
    fn unit_round_trips() {
        assert_eq!(EffectValue::from(()), EffectValue::Unit);
        assert_eq!(<()>::try_from(EffectValue::Unit), Ok(()));
        assert!(<()>::try_from(EffectValue::PasswordVerification(false)).is_err());
    }

    #[rstest]
    fn effect_return_keeps_tag_through_map_and_erase() {
        let typed = EffectReturn::new(EffectTag::ListObjects, vec!["k".to_string()]);
        let erased = typed.map(|mut keys| {
            keys.push("j".into());
            keys
        });
        assert_eq!(erased.value().len(), 2);
        let erased = erased.erase();
        assert_eq!(erased.tag(), EffectTag::ListObjects);
        assert_eq!(erased.value().kind(), "object_keys");
    }
}
