//! Option schema inference.
//!
//! Rust has no runtime signature introspection, so callbacks describe their
//! parameters explicitly with [`Parameter`]. Inference turns that list into
//! one [`OptionDescriptor`] per user-facing parameter, once, at declaration
//! time. The descriptors are immutable afterwards and are what both
//! registration payloads and dispatch read.

use cordkit_proto::{ChannelType, OptionType};
use serde_json::{Value, json};

use super::handler::ArgValue;
use crate::error::DeclarationError;

/// Most choices the platform accepts for one option.
pub const MAX_CHOICES: usize = 25;
/// Longest option or command description the platform accepts.
pub const MAX_DESCRIPTION_LEN: usize = 100;
/// Longest option or command name the platform accepts.
pub const MAX_NAME_LEN: usize = 32;

/// Host-side type of a callback parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// The invocation context. Only valid as the first parameter.
    Interaction,
    /// No annotation. Context if first, string otherwise.
    Untyped,
    String,
    Integer,
    Boolean,
    Float,
    User,
    Member,
    Role,
    GuildChannel,
    Message,
    Mentionable,
    /// Anything else; always rejected.
    Other(String),
}

impl ParamType {
    /// The option kind this parameter registers as.
    pub fn option_type(&self) -> Option<OptionType> {
        Some(match self {
            ParamType::Untyped | ParamType::String => OptionType::String,
            ParamType::Integer => OptionType::Integer,
            ParamType::Boolean => OptionType::Boolean,
            ParamType::Float => OptionType::Number,
            ParamType::User | ParamType::Member => OptionType::User,
            ParamType::Role => OptionType::Role,
            ParamType::GuildChannel => OptionType::Channel,
            ParamType::Mentionable => OptionType::Mentionable,
            // Snowflakes exceed the platform's integer range; message ids
            // travel as strings and are resolved through the cache.
            ParamType::Message => OptionType::String,
            ParamType::Interaction | ParamType::Other(_) => return None,
        })
    }

    /// Name used in error messages.
    pub fn describe(&self) -> &str {
        match self {
            ParamType::Interaction => "Interaction",
            ParamType::Untyped => "<untyped>",
            ParamType::String => "String",
            ParamType::Integer => "i64",
            ParamType::Boolean => "bool",
            ParamType::Float => "f64",
            ParamType::User => "User",
            ParamType::Member => "Member",
            ParamType::Role => "Role",
            ParamType::GuildChannel => "Channel",
            ParamType::Message => "Message",
            ParamType::Mentionable => "Mentionable",
            ParamType::Other(name) => name,
        }
    }
}

/// Explicit per-parameter metadata. Every unset field falls back to what the
/// parameter itself says.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlashOption {
    pub name: Option<String>,
    pub description: Option<String>,
    pub required: Option<bool>,
    /// Ordered display label -> platform value.
    pub choices: Vec<(String, Value)>,
    pub default: Option<ArgValue>,
    pub channel_types: Vec<ChannelType>,
}

impl SlashOption {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choice(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.choices.push((label.into(), value.into()));
        self
    }

    pub fn default_value(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn channel_types(mut self, types: impl IntoIterator<Item = ChannelType>) -> Self {
        self.channel_types.extend(types);
        self
    }
}

/// A parameter's default: nothing, a plain value, or explicit metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    Empty,
    Value(ArgValue),
    Option(SlashOption),
}

/// One declared callback parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub annotation: ParamType,
    pub default: ParamDefault,
    receiver: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, annotation: ParamType) -> Self {
        Self {
            name: name.into(),
            annotation,
            default: ParamDefault::Empty,
            receiver: false,
        }
    }

    /// The leading interaction parameter.
    pub fn context() -> Self {
        Self::new("interaction", ParamType::Interaction)
    }

    /// A leading receiver parameter (the cog the command belongs to).
    pub fn receiver() -> Self {
        Self {
            receiver: true,
            ..Self::new("self", ParamType::Untyped)
        }
    }

    pub fn with_default(mut self, value: impl Into<ArgValue>) -> Self {
        self.default = ParamDefault::Value(value.into());
        self
    }

    pub fn with_option(mut self, option: SlashOption) -> Self {
        self.default = ParamDefault::Option(option);
        self
    }

    #[inline]
    pub fn is_receiver(&self) -> bool {
        self.receiver
    }
}

/// Normalized description of one command option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionDescriptor {
    /// Platform-facing name.
    pub name: String,
    /// Parameter the resolved value is delivered under.
    pub param_name: String,
    pub description: String,
    pub kind: OptionType,
    pub annotation: ParamType,
    pub required: bool,
    /// Substituted when the option is omitted.
    pub default: ArgValue,
    pub choices: Vec<(String, Value)>,
    pub channel_types: Vec<ChannelType>,
}

impl OptionDescriptor {
    /// Registration payload for this option.
    ///
    /// `required` is only sent when true: the platform omits `false` in its
    /// responses, and sending it would make every sync see a difference.
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({
            "type": self.kind.value(),
            "name": self.name,
            "description": self.description,
        });
        if self.required {
            payload["required"] = Value::Bool(true);
        }
        if !self.choices.is_empty() {
            payload["choices"] = self
                .choices
                .iter()
                .map(|(name, value)| json!({"name": name, "value": value}))
                .collect();
        }
        if !self.channel_types.is_empty() {
            payload["channel_types"] = self.channel_types.iter().map(|c| c.value()).collect();
        }
        payload
    }
}

/// Check a platform-facing name. Chat-input names and option names must be
/// lowercase and free of whitespace; context-menu names only have a length
/// limit.
pub(crate) fn check_name(name: &str, chat_input: bool) -> Result<(), DeclarationError> {
    let invalid = |reason| DeclarationError::InvalidName {
        name: name.to_string(),
        reason,
    };
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(invalid("must be 1-32 characters"));
    }
    if !chat_input {
        return Ok(());
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }
    if name.chars().any(char::is_uppercase) {
        return Err(invalid("must be lowercase"));
    }
    Ok(())
}

/// Check a description; an empty one is replaced by a single space.
pub(crate) fn normalize_description(
    owner: &str,
    description: Option<&str>,
) -> Result<String, DeclarationError> {
    match description {
        None | Some("") => Ok(" ".to_string()),
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LEN => {
            Err(DeclarationError::InvalidOptionConfiguration {
                option: owner.to_string(),
                reason: format!("description longer than {MAX_DESCRIPTION_LEN} characters"),
            })
        }
        Some(text) => Ok(text.to_string()),
    }
}

/// Strip the optional receiver and the leading context parameter, checking
/// the context's annotation. Returns the remaining parameters.
pub(crate) fn split_context<'a>(
    command: &str,
    params: &'a [Parameter],
) -> Result<&'a [Parameter], DeclarationError> {
    let params = match params.first() {
        Some(first) if first.is_receiver() => &params[1..],
        _ => params,
    };
    let Some((context, rest)) = params.split_first() else {
        return Ok(params);
    };
    match context.annotation {
        ParamType::Interaction | ParamType::Untyped => Ok(rest),
        ref other => Err(DeclarationError::InvalidContextParameter {
            command: command.to_string(),
            found: other.describe().to_string(),
        }),
    }
}

/// Infer option descriptors for a callback's parameters, in order.
///
/// `params` may start with a receiver (skipped) and must then start with the
/// interaction context (skipped, annotation checked).
pub fn infer_options(
    command: &str,
    params: &[Parameter],
) -> Result<Vec<OptionDescriptor>, DeclarationError> {
    let rest = split_context(command, params)?;
    let mut descriptors: Vec<OptionDescriptor> = Vec::with_capacity(rest.len());
    for param in rest {
        let descriptor = infer_option(param)?;
        if descriptors.iter().any(|d| d.name == descriptor.name) {
            return Err(DeclarationError::DuplicateOption {
                command: command.to_string(),
                option: descriptor.name,
            });
        }
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}

fn infer_option(param: &Parameter) -> Result<OptionDescriptor, DeclarationError> {
    let kind = param
        .annotation
        .option_type()
        .ok_or_else(|| DeclarationError::UnsupportedOptionType {
            param: param.name.clone(),
            annotation: param.annotation.describe().to_string(),
        })?;

    let (meta, default, required) = match &param.default {
        ParamDefault::Empty => (None, ArgValue::None, true),
        ParamDefault::Value(value) => (None, value.clone(), false),
        ParamDefault::Option(meta) => {
            let required = meta.required.unwrap_or(meta.default.is_none());
            let default = meta.default.clone().unwrap_or(ArgValue::None);
            (Some(meta), default, required)
        }
    };

    let name = meta
        .and_then(|m| m.name.clone())
        .unwrap_or_else(|| param.name.clone());
    check_name(&name, true)?;
    let description = normalize_description(&name, meta.and_then(|m| m.description.as_deref()))?;
    let choices = meta.map(|m| m.choices.clone()).unwrap_or_default();
    let channel_types = meta.map(|m| m.channel_types.clone()).unwrap_or_default();

    let descriptor = OptionDescriptor {
        name,
        param_name: param.name.clone(),
        description,
        kind,
        annotation: param.annotation.clone(),
        required,
        default,
        choices,
        channel_types,
    };
    verify(&descriptor)?;
    Ok(descriptor)
}

/// Reject metadata that contradicts the option's type.
fn verify(descriptor: &OptionDescriptor) -> Result<(), DeclarationError> {
    let invalid = |reason: String| DeclarationError::InvalidOptionConfiguration {
        option: descriptor.name.clone(),
        reason,
    };

    if !descriptor.channel_types.is_empty() && descriptor.kind != OptionType::Channel {
        return Err(invalid(format!(
            "channel_types given but the option is a {}",
            descriptor.kind
        )));
    }

    if descriptor.choices.is_empty() {
        return Ok(());
    }
    if descriptor.choices.len() > MAX_CHOICES {
        return Err(invalid(format!("more than {MAX_CHOICES} choices")));
    }
    for (label, value) in &descriptor.choices {
        let fits = match descriptor.kind {
            OptionType::String => value.is_string(),
            OptionType::Integer => value.is_i64() || value.is_u64(),
            OptionType::Number => value.is_number(),
            other => {
                return Err(invalid(format!("{other} options cannot have choices")));
            }
        };
        if !fits {
            return Err(invalid(format!(
                "choice `{label}` has value {value}, which is not a {}",
                descriptor.kind
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_params() -> Vec<Parameter> {
        vec![
            Parameter::context(),
            Parameter::new("text", ParamType::String),
            Parameter::new("loud", ParamType::Boolean).with_default(false),
        ]
    }

    #[test]
    fn test_one_descriptor_per_parameter_in_order() {
        let options = infer_options("echo", &echo_params()).unwrap();
        let names: Vec<_> = options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["text", "loud"]);
        assert!(options[0].required);
        assert_eq!(options[0].description, " ");
        assert!(!options[1].required);
        assert_eq!(options[1].default, ArgValue::Boolean(false));
    }

    #[test]
    fn test_receiver_is_skipped() {
        let mut params = vec![Parameter::receiver()];
        params.extend(echo_params());
        assert_eq!(infer_options("echo", &params).unwrap().len(), 2);
    }

    #[test]
    fn test_untyped_context_and_string_fallback() {
        let params = vec![
            Parameter::new("ctx", ParamType::Untyped),
            Parameter::new("anything", ParamType::Untyped),
        ];
        let options = infer_options("cmd", &params).unwrap();
        assert_eq!(options[0].kind, OptionType::String);
    }

    #[test]
    fn test_context_must_be_interaction() {
        let params = vec![Parameter::new("text", ParamType::String)];
        let err = infer_options("cmd", &params).unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidContextParameter { .. }));
    }

    #[test]
    fn test_unsupported_annotation() {
        let params = vec![
            Parameter::context(),
            Parameter::new("when", ParamType::Other("DateTime".into())),
        ];
        let err = infer_options("cmd", &params).unwrap_err();
        assert!(matches!(
            err,
            DeclarationError::UnsupportedOptionType { ref annotation, .. } if annotation == "DateTime"
        ));
    }

    #[test]
    fn test_metadata_overrides() {
        let params = vec![
            Parameter::context(),
            Parameter::new("target_user", ParamType::Member).with_option(
                SlashOption::new()
                    .name("user")
                    .description("Who to greet")
                    .required(false),
            ),
        ];
        let option = &infer_options("greet", &params).unwrap()[0];
        assert_eq!(option.name, "user");
        assert_eq!(option.param_name, "target_user");
        assert_eq!(option.kind, OptionType::User);
        assert!(!option.required);
        assert_eq!(option.default, ArgValue::None);
    }

    #[test]
    fn test_metadata_default_makes_optional() {
        let params = vec![
            Parameter::context(),
            Parameter::new("count", ParamType::Integer)
                .with_option(SlashOption::new().default_value(5i64)),
        ];
        let option = &infer_options("roll", &params).unwrap()[0];
        assert!(!option.required);
        assert_eq!(option.default, ArgValue::Integer(5));
    }

    #[test]
    fn test_channel_types_only_on_channels() {
        let params = vec![
            Parameter::context(),
            Parameter::new("where", ParamType::String)
                .with_option(SlashOption::new().channel_types([ChannelType::Text])),
        ];
        let err = infer_options("cmd", &params).unwrap_err();
        assert!(matches!(err, DeclarationError::InvalidOptionConfiguration { .. }));

        let params = vec![
            Parameter::context(),
            Parameter::new("where", ParamType::GuildChannel)
                .with_option(SlashOption::new().channel_types([ChannelType::Text])),
        ];
        let option = &infer_options("cmd", &params).unwrap()[0];
        assert_eq!(option.to_payload()["channel_types"], json!([0]));
    }

    #[test]
    fn test_choices_must_match_type() {
        let params = vec![
            Parameter::context(),
            Parameter::new("size", ParamType::Integer)
                .with_option(SlashOption::new().choice("small", 1).choice("big", "2")),
        ];
        assert!(infer_options("cmd", &params).is_err());

        let params = vec![
            Parameter::context(),
            Parameter::new("who", ParamType::User).with_option(SlashOption::new().choice("me", "1")),
        ];
        assert!(infer_options("cmd", &params).is_err());
    }

    #[test]
    fn test_duplicate_option_names() {
        let params = vec![
            Parameter::context(),
            Parameter::new("a", ParamType::String),
            Parameter::new("b", ParamType::String).with_option(SlashOption::new().name("a")),
        ];
        let err = infer_options("cmd", &params).unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateOption { .. }));
    }

    #[test]
    fn test_option_payload() {
        let params = vec![
            Parameter::context(),
            Parameter::new("color", ParamType::String).with_option(
                SlashOption::new()
                    .description("Pick one")
                    .choice("Red", "red")
                    .choice("Blue", "blue"),
            ),
        ];
        let option = &infer_options("paint", &params).unwrap()[0];
        assert_eq!(
            option.to_payload(),
            json!({
                "type": 3,
                "name": "color",
                "description": "Pick one",
                "required": true,
                "choices": [{"name": "Red", "value": "red"}, {"name": "Blue", "value": "blue"}]
            })
        );
    }

    #[test]
    fn test_name_rules() {
        assert!(check_name("ban", true).is_ok());
        assert!(check_name("Ban", true).is_err());
        assert!(check_name("Ban", false).is_ok());
        assert!(check_name("two words", true).is_err());
        assert!(check_name("Two Words", false).is_ok());
        assert!(check_name("", false).is_err());
        assert!(check_name(&"x".repeat(33), false).is_err());
    }
}
