//! Interactive JSON dialect.
//!
//! The document is a JSON object whose `FRAGMENT_SHADER` / `VERTEX_SHADER`
//! strings hold core-language code. Each code string is decoded with an
//! offset table and handed to the core front end, so spans land on the raw
//! bytes of the JSON literal even across escape sequences.

use indexmap::IndexMap;
use log::debug;
use serde_json::{Value, value::RawValue};

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, LineIndex, ShaderFormat, Span,
    ast::{PreludeSymbol, Program, StageKind, Type},
    metadata::{DocumentMetadata, InteractiveMetadata, ParamValue, ParameterInfo, PassInfo},
};

use crate::{ParseOptions, ParseOutput, ShaderParser, glsl::parse_stage, source_map::SourceMap};

type Object<'a> = IndexMap<String, &'a RawValue>;

/// Input names the host defines itself.
const RESERVED_INPUT_NAMES: &[&str] = &[
    "TIME",
    "TIMEDELTA",
    "RENDERSIZE",
    "PASSINDEX",
    "FRAMEINDEX",
    "DATE",
    "isf_FragNormCoord",
    "time",
    "resolution",
    "mouse",
];

const INPUT_TYPES: &[&str] = &[
    "event", "bool", "long", "int", "float", "point2D", "color", "image", "audio", "audioFFT",
];

/// The uniform type an input of this kind is declared as.
fn input_uniform_type(kind: &str) -> Option<Type> {
    let ty = match kind {
        "event" | "bool" => Type::BOOL,
        "long" | "int" => Type::INT,
        "float" => Type::FLOAT,
        "point2D" => Type::vec(2),
        "color" => Type::vec(4),
        "image" | "audio" | "audioFFT" => Type::Opaque("sampler2D".to_string()),
        _ => return None,
    };
    Some(ty)
}

/// Symbols every interactive JSON host provides.
fn host_prelude() -> Vec<PreludeSymbol> {
    vec![
        PreludeSymbol::variable("TIME", Type::FLOAT),
        PreludeSymbol::variable("TIMEDELTA", Type::FLOAT),
        PreludeSymbol::variable("RENDERSIZE", Type::vec(2)),
        PreludeSymbol::variable("PASSINDEX", Type::INT),
        PreludeSymbol::variable("FRAMEINDEX", Type::INT),
        PreludeSymbol::variable("DATE", Type::vec(4)),
        PreludeSymbol::variable("isf_FragNormCoord", Type::vec(2)),
        PreludeSymbol::function("IMG_PIXEL", 2, Type::vec(4)),
        PreludeSymbol::function("IMG_NORM_PIXEL", 2, Type::vec(4)),
        PreludeSymbol::function("IMG_THIS_PIXEL", 1, Type::vec(4)),
        PreludeSymbol::function("IMG_THIS_NORM_PIXEL", 1, Type::vec(4)),
        PreludeSymbol::function("IMG_SIZE", 1, Type::vec(2)),
    ]
}

fn param_value(value: &Value) -> Option<ParamValue> {
    match value {
        Value::Number(n) => n.as_f64().map(ParamValue::Number),
        Value::Bool(b) => Some(ParamValue::Bool(*b)),
        Value::String(s) => Some(ParamValue::Text(s.clone())),
        Value::Array(items) => items
            .iter()
            .map(Value::as_f64)
            .collect::<Option<Vec<_>>>()
            .map(ParamValue::Vector),
        _ => None,
    }
}

/// Numeric components of a scalar or vector value.
fn components(value: &ParamValue) -> Option<Vec<f64>> {
    match value {
        ParamValue::Number(n) => Some(vec![*n]),
        ParamValue::Vector(v) => Some(v.clone()),
        _ => None,
    }
}

/// Whether a `DEFAULT` has the shape its input type requires.
fn default_shape_ok(kind: &str, value: &ParamValue) -> Result<(), &'static str> {
    let ok = match kind {
        "float" | "long" | "int" => matches!(value, ParamValue::Number(_)),
        "bool" | "event" => matches!(value, ParamValue::Bool(_) | ParamValue::Number(_)),
        "point2D" => matches!(value, ParamValue::Vector(v) if v.len() == 2),
        "color" => matches!(value, ParamValue::Vector(v) if v.len() == 4),
        _ => true,
    };
    if ok {
        return Ok(());
    }
    Err(match kind {
        "float" | "long" | "int" => "a number",
        "bool" | "event" => "a boolean",
        "point2D" => "an array of 2 numbers",
        _ => "an array of 4 numbers",
    })
}

/// Decode a JSON string literal (quotes included) that starts at document
/// offset `base`.
///
/// Returns the decoded text and the document offset of every decoded byte,
/// plus a trailing entry for the closing quote.
fn decode_string(raw: &str, base: usize) -> Option<(String, Vec<usize>)> {
    let body = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut text = String::with_capacity(body.len());
    let mut offsets = Vec::with_capacity(body.len() + 1);
    let mut chars = body.char_indices();

    while let Some((at, c)) = chars.next() {
        let start = base + 1 + at;
        let before = text.len();
        if c != '\\' {
            // A raw character keeps its own byte offsets.
            text.push(c);
            offsets.extend((0..text.len() - before).map(|i| start + i));
            continue;
        }
        let decoded = match chars.next()?.1 {
            '"' => '"',
            '\\' => '\\',
            '/' => '/',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'u' => {
                let high = hex_escape(&mut chars)?;
                if (0xD800..0xDC00).contains(&high) {
                    // A surrogate pair spans two `\u` escapes.
                    let low = match (chars.next(), chars.next()) {
                        (Some((_, '\\')), Some((_, 'u'))) => hex_escape(&mut chars)?,
                        _ => return None,
                    };
                    let code = 0x10000 + ((high - 0xD800) << 10) + low.checked_sub(0xDC00)?;
                    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
                } else {
                    char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)
                }
            }
            _ => return None,
        };
        text.push(decoded);
        offsets.extend(std::iter::repeat_n(start, text.len() - before));
    }

    offsets.push(base + raw.len() - 1);
    Some((text, offsets))
}

fn hex_escape(chars: &mut impl Iterator<Item = (usize, char)>) -> Option<u32> {
    let mut value = 0;
    for _ in 0..4 {
        value = value * 16 + chars.next()?.1.to_digit(16)?;
    }
    Some(value)
}

/// A decoded code string.
struct CodeString {
    text: String,
    offsets: Vec<usize>,
    span: Span,
}

/// Walks the JSON document, reporting structural problems as it goes.
struct JsonDocument<'a, 'i> {
    source: &'a str,
    index: &'i LineIndex<'a>,
    diagnostics: DiagnosticCollector,
}

impl<'a, 'i> JsonDocument<'a, 'i> {
    fn new(source: &'a str, index: &'i LineIndex<'a>) -> Self {
        Self {
            source,
            index,
            diagnostics: DiagnosticCollector::new(),
        }
    }

    /// Document offset of a raw value, which always borrows from `source`.
    fn offset(&self, raw: &RawValue) -> usize {
        let offset = (raw.get().as_ptr() as usize).saturating_sub(self.source.as_ptr() as usize);
        offset.min(self.source.len())
    }

    fn span(&self, raw: &RawValue) -> Span {
        let start = self.offset(raw);
        self.index.span(start..start + raw.get().len())
    }

    fn root(&mut self) -> Option<Object<'a>> {
        let raw: &'a RawValue = match serde_json::from_str(self.source) {
            Ok(raw) => raw,
            Err(err) => {
                self.diagnostics.emit(
                    Diagnostic::error(DiagnosticCode::InvalidJson, format!("invalid JSON: {err}"))
                        .with_suggestion(
                            "check for trailing commas, unquoted keys and raw newlines inside strings",
                        ),
                );
                return None;
            }
        };
        match serde_json::from_str::<Object<'a>>(raw.get()) {
            Ok(object) => Some(object),
            Err(_) => {
                self.diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticCode::InvalidStructure,
                        "the document must be a JSON object",
                    )
                    .with_span(self.span(raw)),
                );
                None
            }
        }
    }

    fn wrong_type(&mut self, key: &str, expected: &str, raw: &RawValue) {
        self.diagnostics.emit(
            Diagnostic::error(
                DiagnosticCode::InvalidStructure,
                format!("`{key}` must be {expected}"),
            )
            .with_span(self.span(raw)),
        );
    }

    fn missing_key(&mut self, key: &str, suggestion: &str) {
        self.diagnostics.emit(
            Diagnostic::error(
                DiagnosticCode::MissingRequiredKey,
                format!("missing required key `{key}`"),
            )
            .with_suggestion(suggestion),
        );
    }

    fn string(&mut self, object: &Object<'a>, key: &str) -> Option<(String, Span)> {
        let raw = *object.get(key)?;
        match serde_json::from_str::<String>(raw.get()) {
            Ok(value) => Some((value, self.span(raw))),
            Err(_) => {
                self.wrong_type(key, "a string", raw);
                None
            }
        }
    }

    /// A boolean flag; ISF hosts also accept `0` and `1`.
    fn flag(&mut self, object: &Object<'a>, key: &str) -> bool {
        let Some(&raw) = object.get(key) else {
            return false;
        };
        match serde_json::from_str::<Value>(raw.get()) {
            Ok(Value::Bool(value)) => value,
            Ok(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => {
                self.wrong_type(key, "a boolean", raw);
                false
            }
        }
    }

    fn array(&mut self, raw: &'a RawValue, key: &str) -> Option<Vec<&'a RawValue>> {
        match serde_json::from_str(raw.get()) {
            Ok(items) => Some(items),
            Err(_) => {
                self.wrong_type(key, "an array", raw);
                None
            }
        }
    }

    fn object(&mut self, raw: &'a RawValue, what: &str) -> Option<Object<'a>> {
        match serde_json::from_str(raw.get()) {
            Ok(object) => Some(object),
            Err(_) => {
                self.wrong_type(what, "an object", raw);
                None
            }
        }
    }

    fn code(&mut self, object: &Object<'a>, key: &str) -> Option<CodeString> {
        let raw = *object.get(key)?;
        let decoded = raw
            .get()
            .starts_with('"')
            .then(|| decode_string(raw.get(), self.offset(raw)))
            .flatten();
        match decoded {
            Some((text, offsets)) => Some(CodeString {
                text,
                offsets,
                span: self.span(raw),
            }),
            None => {
                self.wrong_type(key, "a string of shader code", raw);
                None
            }
        }
    }

    fn metadata(&mut self, root: &Object<'a>, metadata: &mut InteractiveMetadata) {
        metadata.name = self.string(root, "NAME").map(|(name, _)| name);
        metadata.description = self.string(root, "DESCRIPTION").map(|(text, _)| text);
        metadata.credit = self
            .string(root, "CREDIT")
            .or_else(|| self.string(root, "AUTHOR"))
            .map(|(text, _)| text);
        if let Some(&raw) = root.get("CATEGORIES") {
            match serde_json::from_str::<Vec<String>>(raw.get()) {
                Ok(categories) => metadata.categories = categories,
                Err(_) => self.wrong_type("CATEGORIES", "an array of strings", raw),
            }
        }

        let mut missing = Vec::new();
        if !root.contains_key("NAME") {
            missing.push("`NAME`");
        }
        if !root.contains_key("DESCRIPTION") {
            missing.push("`DESCRIPTION`");
        }
        if !root.contains_key("CREDIT") && !root.contains_key("AUTHOR") {
            missing.push("`CREDIT`");
        }
        if !root.contains_key("CATEGORIES") {
            missing.push("`CATEGORIES`");
        }
        if !missing.is_empty() {
            self.diagnostics.emit(
                Diagnostic::info(
                    DiagnosticCode::MissingMetadata,
                    format!("missing descriptive metadata: {}", missing.join(", ")),
                )
                .with_suggestion("add the keys so hosts can list and credit the shader"),
            );
        }
    }

    /// Check the pass list, returning its summary and any per-pass code.
    fn passes(&mut self, root: &Object<'a>) -> (Vec<PassInfo>, Vec<(usize, CodeString)>) {
        let mut passes = Vec::new();
        let mut code = Vec::new();

        let Some(&raw) = root.get("PASSES") else {
            self.missing_key("PASSES", "add `\"PASSES\": [{}]` for a single-pass shader");
            return (passes, code);
        };
        let Some(items) = self.array(raw, "PASSES") else {
            return (passes, code);
        };
        if items.is_empty() {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::InvalidStructure,
                    "`PASSES` must declare at least one pass",
                )
                .with_span(self.span(raw))
                .with_suggestion("add `{}` for a single pass"),
            );
            return (passes, code);
        }

        let mut targets: IndexMap<String, Span> = IndexMap::new();
        for (i, item) in items.into_iter().enumerate() {
            let Some(pass) = self.object(item, &format!("PASSES[{i}]")) else {
                continue;
            };
            let target = self.string(&pass, "TARGET");
            let persistent = self.flag(&pass, "PERSISTENT");
            let float = self.flag(&pass, "FLOAT");

            match &target {
                Some((name, span)) => {
                    if let Some(first) = targets.get(name) {
                        self.diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticCode::DuplicatePassTarget,
                                format!("pass target `{name}` is already written by another pass"),
                            )
                            .with_span(*span)
                            .with_label(*first, "first written here")
                            .with_suggestion("give each pass its own `TARGET`"),
                        );
                    } else {
                        targets.insert(name.clone(), *span);
                    }
                }
                None if persistent => self.diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticCode::PersistentPassWithoutTarget,
                        "persistent pass has no `TARGET` to persist",
                    )
                    .with_span(self.span(item))
                    .with_suggestion("add a `TARGET` name or drop `PERSISTENT`"),
                ),
                None => {}
            }

            if let Some(pass_code) = self.code(&pass, "FRAGMENT_SHADER") {
                code.push((i, pass_code));
            }
            passes.push(PassInfo {
                target: target.map(|(name, _)| name),
                persistent,
                float,
            });
        }
        (passes, code)
    }

    fn inputs(&mut self, root: &Object<'a>) -> Vec<ParameterInfo> {
        let mut inputs = Vec::new();
        let Some(&raw) = root.get("INPUTS") else {
            return inputs;
        };
        let Some(items) = self.array(raw, "INPUTS") else {
            return inputs;
        };

        let mut seen: IndexMap<String, Span> = IndexMap::new();
        for (i, item) in items.into_iter().enumerate() {
            let Some(input) = self.object(item, &format!("INPUTS[{i}]")) else {
                continue;
            };
            let span = self.span(item);
            if let Some(info) = self.input(&input, i, span, &mut seen) {
                inputs.push(info);
            }
        }
        inputs
    }

    fn input(
        &mut self,
        input: &Object<'a>,
        position: usize,
        span: Span,
        seen: &mut IndexMap<String, Span>,
    ) -> Option<ParameterInfo> {
        let value = |key: &str| -> Option<Value> {
            input
                .get(key)
                .and_then(|raw| serde_json::from_str(raw.get()).ok())
        };

        let Some(name) = value("NAME").and_then(|v| v.as_str().map(str::to_string)) else {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::InvalidParameter,
                    format!("input {position} has no `NAME`"),
                )
                .with_span(span)
                .with_suggestion("add a `NAME` string"),
            );
            return None;
        };
        let Some(kind) = value("TYPE").and_then(|v| v.as_str().map(str::to_string)) else {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::InvalidParameter,
                    format!("input `{name}` has no `TYPE`"),
                )
                .with_span(span)
                .with_suggestion(format!("use one of: {}", INPUT_TYPES.join(", "))),
            );
            return None;
        };
        if !INPUT_TYPES.contains(&kind.as_str()) {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::InvalidParameter,
                    format!("input `{name}` has unknown type `{kind}`"),
                )
                .with_span(span)
                .with_suggestion(format!("use one of: {}", INPUT_TYPES.join(", "))),
            );
            return None;
        }

        if let Some(first) = seen.get(&name) {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::DuplicateParameter,
                    format!("input `{name}` is declared twice"),
                )
                .with_span(span)
                .with_label(*first, "first declared here"),
            );
        } else {
            seen.insert(name.clone(), span);
        }
        if RESERVED_INPUT_NAMES.contains(&name.as_str()) {
            self.diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticCode::ReservedParameterName,
                    format!("input name `{name}` is reserved by the host"),
                )
                .with_span(span)
                .with_suggestion("rename the input"),
            );
        }

        let default = value("DEFAULT").as_ref().and_then(param_value);
        let min = value("MIN").as_ref().and_then(param_value);
        let max = value("MAX").as_ref().and_then(param_value);

        let bounds = min
            .as_ref()
            .and_then(components)
            .zip(max.as_ref().and_then(components))
            .filter(|(lo, hi)| lo.len() == hi.len());
        if let Some((lo, hi)) = &bounds
            && lo.iter().zip(hi).any(|(lo, hi)| lo > hi)
        {
            self.diagnostics.emit(
                Diagnostic::error(
                    DiagnosticCode::InvalidParameterRange,
                    format!("`MIN` of input `{name}` is greater than its `MAX`"),
                )
                .with_span(span)
                .with_suggestion("swap `MIN` and `MAX`"),
            );
        }

        if let Some(default) = &default {
            match default_shape_ok(&kind, default) {
                Err(expected) => self.diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticCode::InvalidParameterDefault,
                        format!("`DEFAULT` of {kind} input `{name}` must be {expected}"),
                    )
                    .with_span(span),
                ),
                Ok(()) => {
                    let outside = components(default).is_some_and(|value| {
                        let below = min
                            .as_ref()
                            .and_then(components)
                            .filter(|lo| lo.len() == value.len())
                            .is_some_and(|lo| value.iter().zip(&lo).any(|(v, lo)| v < lo));
                        let above = max
                            .as_ref()
                            .and_then(components)
                            .filter(|hi| hi.len() == value.len())
                            .is_some_and(|hi| value.iter().zip(&hi).any(|(v, hi)| v > hi));
                        below || above
                    });
                    if outside {
                        self.diagnostics.emit(
                            Diagnostic::error(
                                DiagnosticCode::InvalidParameterRange,
                                format!("`DEFAULT` of input `{name}` lies outside `[MIN, MAX]`"),
                            )
                            .with_span(span),
                        );
                    }
                }
            }
        }

        Some(ParameterInfo {
            name,
            kind,
            default,
            min,
            max,
            label: value("LABEL").and_then(|v| v.as_str().map(str::to_string)),
        })
    }
}

/// JSON documents with embedded code strings.
#[derive(Debug, Default)]
pub struct InteractiveJsonParser;

impl ShaderParser for InteractiveJsonParser {
    fn format(&self) -> ShaderFormat {
        ShaderFormat::InteractiveJson
    }

    fn parse(&self, source: &str, options: &ParseOptions) -> ParseOutput {
        let index = LineIndex::new(source);
        let mut document = JsonDocument::new(source, &index);
        let mut metadata = InteractiveMetadata::default();
        let mut program = Program::default();

        let Some(root) = document.root() else {
            return ParseOutput {
                program,
                diagnostics: document.diagnostics.finish(),
                metadata: DocumentMetadata::Interactive(metadata),
            };
        };

        document.metadata(&root, &mut metadata);
        let (passes, pass_code) = document.passes(&root);
        metadata.inputs = document.inputs(&root);

        let mut code = Vec::new();
        if let Some(vertex) = document.code(&root, "VERTEX_SHADER") {
            code.push((StageKind::Vertex, "VERTEX_SHADER".to_string(), vertex));
        }
        if let Some(fragment) = document.code(&root, "FRAGMENT_SHADER") {
            code.push((StageKind::Fragment, "FRAGMENT_SHADER".to_string(), fragment));
        }
        for (i, fragment) in pass_code {
            code.push((
                StageKind::Fragment,
                format!("PASSES[{i}].FRAGMENT_SHADER"),
                fragment,
            ));
        }
        if code.is_empty()
            && !root.contains_key("FRAGMENT_SHADER")
            && !root.contains_key("VERTEX_SHADER")
        {
            document.missing_key(
                "FRAGMENT_SHADER",
                "add the shader code as a `FRAGMENT_SHADER` string",
            );
        }

        let mut diagnostics = document.diagnostics;
        for (
            kind,
            label,
            CodeString {
                text,
                offsets,
                span,
            },
        ) in code
        {
            let map = SourceMap::table(&index, offsets);
            let (stage, stage_diagnostics) = parse_stage(&text, &map, kind, &label, span, options);
            diagnostics.extend(stage_diagnostics);
            program.stages.push(stage);
        }

        program.prelude = host_prelude();
        for input in &metadata.inputs {
            if let Some(ty) = input_uniform_type(&input.kind) {
                program
                    .prelude
                    .push(PreludeSymbol::uniform(input.name.clone(), ty));
            }
        }
        for target in passes.iter().filter_map(|pass| pass.target.as_ref()) {
            program.prelude.push(PreludeSymbol::uniform(
                target.clone(),
                Type::Opaque("sampler2D".to_string()),
            ));
        }
        metadata.passes = passes;

        debug!(
            stages = program.stages.len(),
            inputs = metadata.inputs.len();
            "Parsed interactive JSON document"
        );
        ParseOutput {
            program,
            diagnostics: diagnostics.finish(),
            metadata: DocumentMetadata::Interactive(metadata),
        }
    }
}
