//! Typed random resources

use kutt_infra_core::{
    IntoProperties, Output, PropertySet, Props, RegisteredResource, Resource, Urn,
};

/// Symbols used when no override set is given
pub const DEFAULT_SPECIAL: &str = "!@#$%&*()-_=+[]{}<>:?";

/// Arguments of a generated password
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomPasswordArgs {
    pub length: usize,
    pub special: bool,

    /// Symbol set replacing [`DEFAULT_SPECIAL`]
    pub override_special: Option<String>,
    pub min_special: usize,
    pub upper: bool,
    pub lower: bool,
    pub numeric: bool,
}

impl RandomPasswordArgs {
    pub fn new(length: usize) -> Self {
        Self {
            length,
            special: true,
            override_special: None,
            min_special: 0,
            upper: true,
            lower: true,
            numeric: true,
        }
    }

    /// Restrict symbols to `symbols` and require at least `min` of them
    pub fn with_special(mut self, symbols: &str, min: usize) -> Self {
        self.special = true;
        self.override_special = Some(symbols.to_string());
        self.min_special = min;
        self
    }

    pub fn without_special(mut self) -> Self {
        self.special = false;
        self.min_special = 0;
        self
    }
}

impl IntoProperties for RandomPasswordArgs {
    fn into_properties(self) -> PropertySet {
        let props = Props::new()
            .set_value("length", self.length)
            .set_value("special", self.special)
            .set_value("min_special", self.min_special)
            .set_value("upper", self.upper)
            .set_value("lower", self.lower)
            .set_value("numeric", self.numeric);
        match self.override_special {
            Some(symbols) => props.set_value("override_special", symbols),
            None => props,
        }
        .build()
    }
}

/// A generated password; the result is always secret
#[derive(Debug, Clone)]
pub struct RandomPassword {
    pub urn: Urn,
    pub result: Output<String>,
}

impl Resource for RandomPassword {
    const TYPE_TOKEN: &'static str = "random:index/randomPassword:RandomPassword";

    type Args = RandomPasswordArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            result: resource.output::<String>("result").as_secret(),
            urn: resource.urn,
        }
    }
}

/// Arguments of a generated identifier fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomStringArgs {
    pub length: usize,
    pub special: bool,
    pub upper: bool,
    pub lower: bool,
    pub numeric: bool,
}

impl RandomStringArgs {
    /// Lowercase letters and digits only, safe inside resource names
    pub fn name_safe(length: usize) -> Self {
        Self {
            length,
            special: false,
            upper: false,
            lower: true,
            numeric: true,
        }
    }
}

impl IntoProperties for RandomStringArgs {
    fn into_properties(self) -> PropertySet {
        Props::new()
            .set_value("length", self.length)
            .set_value("special", self.special)
            .set_value("upper", self.upper)
            .set_value("lower", self.lower)
            .set_value("numeric", self.numeric)
            .build()
    }
}

/// A generated string that is not secret
#[derive(Debug, Clone)]
pub struct RandomString {
    pub urn: Urn,
    pub result: Output<String>,
}

impl Resource for RandomString {
    const TYPE_TOKEN: &'static str = "random:index/randomString:RandomString";

    type Args = RandomStringArgs;

    fn from_registered(resource: RegisteredResource) -> Self {
        Self {
            result: resource.output("result"),
            urn: resource.urn,
        }
    }
}
