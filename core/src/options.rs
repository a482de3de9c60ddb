//! Checkout options attached to an invoice.
//!
//! `InvoiceCheckoutOptions` is immutable; build it with
//! `InvoiceCheckoutOptionsBuilder`. The speed policy is checked the moment
//! it is set, and a rejected value leaves the builder as it was.
//!
//! Serialization goes through one ordered field list (`fields`) so the JSON
//! keys are exactly the Greenfield names, every field is present, and unset
//! fields are `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// How many confirmations BTCPay waits for before an invoice is settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedPolicy {
    HighSpeed,
    MediumSpeed,
    LowSpeed,
    LowMediumSpeed,
}

impl SpeedPolicy {
    pub const ALL: [SpeedPolicy; 4] = [
        SpeedPolicy::HighSpeed,
        SpeedPolicy::MediumSpeed,
        SpeedPolicy::LowSpeed,
        SpeedPolicy::LowMediumSpeed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedPolicy::HighSpeed => "HighSpeed",
            SpeedPolicy::MediumSpeed => "MediumSpeed",
            SpeedPolicy::LowSpeed => "LowSpeed",
            SpeedPolicy::LowMediumSpeed => "LowMediumSpeed",
        }
    }
}

impl fmt::Display for SpeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeedPolicy {
    type Err = ApiError;

    /// Exact, case-sensitive match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SpeedPolicy::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                ApiError::InvalidArgument(format!(
                    "Passed value for speedPolicy is not allowed: {s:?}"
                ))
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceCheckoutOptions {
    speed_policy: Option<SpeedPolicy>,
    payment_methods: Option<Vec<String>>,
    expiration_minutes: Option<i64>,
    monitoring_minutes: Option<i64>,
    payment_tolerance: Option<f64>,
    redirect_url: Option<String>,
    redirect_automatically: Option<bool>,
    default_language: Option<String>,
    requires_refund_email: Option<bool>,
}

impl InvoiceCheckoutOptions {
    pub fn builder() -> InvoiceCheckoutOptionsBuilder {
        InvoiceCheckoutOptionsBuilder::default()
    }

    /// Set every field in one call. The speed policy goes through the same
    /// check as `InvoiceCheckoutOptionsBuilder::speed_policy`. Pass
    /// `Some(false)` for `requires_refund_email` to match what BTCPay's own
    /// clients send by default.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        speed_policy: Option<&str>,
        payment_methods: Option<Vec<String>>,
        expiration_minutes: Option<i64>,
        monitoring_minutes: Option<i64>,
        payment_tolerance: Option<f64>,
        redirect_url: Option<String>,
        redirect_automatically: Option<bool>,
        default_language: Option<String>,
        requires_refund_email: Option<bool>,
    ) -> Result<Self, ApiError> {
        let mut builder = Self::builder();
        builder
            .speed_policy(speed_policy)?
            .payment_methods(payment_methods)
            .expiration_minutes(expiration_minutes)
            .monitoring_minutes(monitoring_minutes)
            .payment_tolerance(payment_tolerance)
            .redirect_url(redirect_url)
            .redirect_automatically(redirect_automatically)
            .default_language(default_language)
            .requires_refund_email(requires_refund_email);
        Ok(builder.build())
    }

    pub fn speed_policy(&self) -> Option<SpeedPolicy> {
        self.speed_policy
    }

    pub fn payment_methods(&self) -> Option<&[String]> {
        self.payment_methods.as_deref()
    }

    pub fn expiration_minutes(&self) -> Option<i64> {
        self.expiration_minutes
    }

    pub fn monitoring_minutes(&self) -> Option<i64> {
        self.monitoring_minutes
    }

    pub fn payment_tolerance(&self) -> Option<f64> {
        self.payment_tolerance
    }

    pub fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    pub fn redirect_automatically(&self) -> Option<bool> {
        self.redirect_automatically
    }

    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    pub fn requires_refund_email(&self) -> Option<bool> {
        self.requires_refund_email
    }

    /// Every field as `(wire name, value)`, in wire order.
    pub fn fields(&self) -> [(&'static str, Value); 9] {
        [
            ("speedPolicy", opt(self.speed_policy.map(SpeedPolicy::as_str))),
            ("paymentMethods", opt(self.payment_methods.clone())),
            ("expirationMinutes", opt(self.expiration_minutes)),
            ("monitoringMinutes", opt(self.monitoring_minutes)),
            ("paymentTolerance", opt(self.payment_tolerance)),
            ("redirectURL", opt(self.redirect_url.clone())),
            ("redirectAutomatically", opt(self.redirect_automatically)),
            ("defaultLanguage", opt(self.default_language.clone())),
            ("requiresRefundEmail", opt(self.requires_refund_email)),
        ]
    }

    /// Flatten into a JSON object keyed by wire name, unset fields as null.
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

fn opt<T: Into<Value>>(value: Option<T>) -> Value {
    value.map_or(Value::Null, Into::into)
}

impl Serialize for InvoiceCheckoutOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_map().serialize(serializer)
    }
}

/// Mutable staging area for `InvoiceCheckoutOptions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceCheckoutOptionsBuilder {
    inner: InvoiceCheckoutOptions,
}

impl InvoiceCheckoutOptionsBuilder {
    /// Set the speed policy from its wire name. `None` or `""` clears it.
    /// Anything outside the four known policies is rejected and the current
    /// value is kept.
    pub fn speed_policy(&mut self, value: Option<&str>) -> Result<&mut Self, ApiError> {
        self.inner.speed_policy = match value {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(self)
    }

    pub fn speed(&mut self, policy: SpeedPolicy) -> &mut Self {
        self.inner.speed_policy = Some(policy);
        self
    }

    pub fn payment_methods(&mut self, methods: Option<Vec<String>>) -> &mut Self {
        self.inner.payment_methods = methods;
        self
    }

    pub fn expiration_minutes(&mut self, minutes: Option<i64>) -> &mut Self {
        self.inner.expiration_minutes = minutes;
        self
    }

    pub fn monitoring_minutes(&mut self, minutes: Option<i64>) -> &mut Self {
        self.inner.monitoring_minutes = minutes;
        self
    }

    pub fn payment_tolerance(&mut self, tolerance: Option<f64>) -> &mut Self {
        self.inner.payment_tolerance = tolerance;
        self
    }

    pub fn redirect_url(&mut self, url: Option<String>) -> &mut Self {
        self.inner.redirect_url = url;
        self
    }

    pub fn redirect_automatically(&mut self, value: Option<bool>) -> &mut Self {
        self.inner.redirect_automatically = value;
        self
    }

    pub fn default_language(&mut self, language: Option<String>) -> &mut Self {
        self.inner.default_language = language;
        self
    }

    pub fn requires_refund_email(&mut self, value: Option<bool>) -> &mut Self {
        self.inner.requires_refund_email = value;
        self
    }

    /// Current speed policy, for inspecting a builder after a rejected set.
    pub fn current_speed_policy(&self) -> Option<SpeedPolicy> {
        self.inner.speed_policy
    }

    pub fn build(&self) -> InvoiceCheckoutOptions {
        self.inner.clone()
    }
}
