//! Annotated mapping dialect.
//!
//! Plain core-language text whose line comments carry `@tag` annotations
//! and stage markers such as `// FRAGMENT_SHADER`. Each stage section is a
//! contiguous slice of the document, so its spans are a constant shift away.

use std::ops::Range;

use indexmap::IndexMap;
use log::{debug, trace};

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, LineIndex, ShaderFormat, Span,
    ast::{PreludeSymbol, Program, Stage, StageKind, Type},
    metadata::{AnnotatedMetadata, DocumentMetadata, ParamValue, ParameterInfo, PortInfo},
};

use crate::{
    ParseOptions, ParseOutput, ShaderParser,
    glsl::parse_stage,
    source_map::SourceMap,
    tag::{ParamTag, PortTag, Tag, default_value, parse_tag},
};

/// What a source line means to the section splitter.
enum LineKind {
    Marker(StageKind),
    /// A `@tag`, starting at this document offset.
    Tag(usize),
    Other,
}

fn classify(line: &str, start: usize) -> LineKind {
    let trimmed = line.trim_start();
    let Some(body) = trimmed.strip_prefix("//") else {
        return LineKind::Other;
    };
    if let Some(kind) = StageKind::from_marker(body.trim()) {
        return LineKind::Marker(kind);
    }
    let tag = body.trim_start();
    if tag.starts_with('@') {
        LineKind::Tag(start + (line.len() - tag.len()))
    } else {
        LineKind::Other
    }
}

/// Lines of `source` with their byte ranges, newline excluded.
fn lines(source: &str) -> impl Iterator<Item = (Range<usize>, &str)> {
    let mut start = 0;
    source.split_inclusive('\n').map(move |raw| {
        let line = raw.trim_end_matches(['\n', '\r']);
        let range = start..start + line.len();
        start += raw.len();
        (range, line)
    })
}

/// Uniform types a parameter of this kind may bind to.
fn param_uniform_types(kind: &str) -> Vec<Type> {
    match kind {
        "float" => vec![Type::FLOAT],
        "int" | "enum" => vec![Type::INT],
        "bool" => vec![Type::BOOL],
        "vec2" => vec![Type::vec(2)],
        "vec3" => vec![Type::vec(3)],
        "vec4" => vec![Type::vec(4)],
        "color" => vec![Type::vec(4), Type::vec(3)],
        _ => vec![Type::Opaque("sampler2D".to_string())],
    }
}

fn port_type(kind: &str) -> Type {
    match kind {
        "texture" | "sampler2D" | "image" => Type::Opaque("sampler2D".to_string()),
        "color" => Type::vec(4),
        other => param_uniform_types(other)
            .into_iter()
            .next()
            .unwrap_or(Type::FLOAT),
    }
}

/// A `@param` tag with the span of its text.
struct DeclaredParam {
    info: ParameterInfo,
    span: Span,
}

/// Collects tags into metadata, reporting malformed ones.
struct TagCollector<'i, 'a> {
    source: &'a str,
    index: &'i LineIndex<'a>,
    metadata: AnnotatedMetadata,
    params: Vec<DeclaredParam>,
}

impl<'a> TagCollector<'_, 'a> {
    fn collect(&mut self, at: usize, end: usize, diagnostics: &mut DiagnosticCollector) {
        let text = self.source[at..end].trim_end();
        let span = self.index.span(at..at + text.len());
        let span_of = |range: Range<usize>| self.index.span(at + range.start..at + range.end);

        let tag = match parse_tag(text) {
            Ok(tag) => tag,
            Err(err) => {
                diagnostics.emit(
                    Diagnostic::error(DiagnosticCode::InvalidTag, err.message)
                        .with_span(span_of(err.range)),
                );
                return;
            }
        };

        let metadata = &mut self.metadata;
        match tag {
            Tag::Name(name) => {
                metadata.name.get_or_insert_with(|| name.to_string());
            }
            Tag::Description(text) => {
                metadata.description.get_or_insert_with(|| text.to_string());
            }
            Tag::Author(author) => {
                metadata.author.get_or_insert_with(|| author.to_string());
            }
            Tag::Version(version) => {
                metadata.version.get_or_insert_with(|| version.to_string());
            }
            Tag::Category(category) => metadata.categories.push(category.to_string()),
            Tag::Input(port) => metadata.inputs.push(port_info(port)),
            Tag::Output(port) => metadata.outputs.push(port_info(port)),
            Tag::Param(param) => {
                if let Some(info) = param_info(param, span, diagnostics) {
                    self.params.push(DeclaredParam { info, span });
                }
            }
            Tag::Unknown { name, range } => diagnostics.emit(
                Diagnostic::info(
                    DiagnosticCode::UnknownTag,
                    format!("unknown annotation `@{name}`"),
                )
                .with_span(span_of(range))
                .with_suggestion(
                    "use `@name`, `@description`, `@author`, `@version`, `@category`, `@param`, `@input` or `@output`",
                ),
            ),
        }
    }
}

fn port_info(port: PortTag<'_>) -> PortInfo {
    PortInfo {
        name: port.name.to_string(),
        kind: port.kind.to_string(),
        description: port.description.map(str::to_string),
    }
}

fn param_info(
    param: ParamTag<'_>,
    span: Span,
    diagnostics: &mut DiagnosticCollector,
) -> Option<ParameterInfo> {
    let name = param.name;
    let default = match param.default {
        Some(text) => match default_value(param.kind, text) {
            Some(value) => Some(value),
            None => {
                diagnostics.emit(
                    Diagnostic::error(
                        DiagnosticCode::InvalidTag,
                        format!("`default:{text}` is not a valid {} value", param.kind),
                    )
                    .with_span(span),
                );
                return None;
            }
        },
        None => None,
    };

    if let (Some(min), Some(max)) = (param.min, param.max)
        && min > max
    {
        diagnostics.emit(
            Diagnostic::error(
                DiagnosticCode::InvalidParameterRange,
                format!("`min:{min}` of parameter `{name}` is greater than `max:{max}`"),
            )
            .with_span(span)
            .with_suggestion("swap the bounds"),
        );
    } else if let Some(ParamValue::Number(value)) = &default
        && (param.min.is_some_and(|min| *value < min) || param.max.is_some_and(|max| *value > max))
    {
        diagnostics.emit(
            Diagnostic::error(
                DiagnosticCode::InvalidParameterRange,
                format!("default of parameter `{name}` lies outside its `min`/`max` range"),
            )
            .with_span(span),
        );
    }

    Some(ParameterInfo {
        name: name.to_string(),
        kind: param.kind.to_string(),
        default,
        min: param.min.map(ParamValue::Number),
        max: param.max.map(ParamValue::Number),
        label: param.label.map(str::to_string),
    })
}

/// Whether a parsed section holds anything besides comments.
fn has_code(stage: &Stage) -> bool {
    !stage.declarations.is_empty()
        || stage.version.is_some()
        || !stage.extensions.is_empty()
        || !stage.macros.is_empty()
}

/// The extent of everything a section declares.
fn code_span(stage: &Stage) -> Option<Span> {
    let declarations = stage.declarations.iter().map(|d| d.span);
    let directives = stage
        .version
        .iter()
        .map(|v| v.span)
        .chain(stage.extensions.iter().map(|e| e.span))
        .chain(stage.macros.iter().map(|m| m.span));
    declarations.chain(directives).reduce(|a, b| a.union(b))
}

/// Check `@param` tags against the uniforms the stages actually declare.
fn cross_check(
    program: &Program,
    params: &[DeclaredParam],
    metadata: &AnnotatedMetadata,
    diagnostics: &mut DiagnosticCollector,
) {
    let mut uniforms: IndexMap<&str, (&Type, Span, Span)> = IndexMap::new();
    for stage in &program.stages {
        for uniform in stage.uniforms() {
            uniforms.entry(uniform.name.as_str()).or_insert((
                uniform.ty.inner(),
                uniform.ty.span(),
                uniform.name.span(),
            ));
        }
    }

    for param in params {
        let name = param.info.name.as_str();
        match uniforms.get(name) {
            None => diagnostics.emit(
                Diagnostic::warning(
                    DiagnosticCode::ParamWithoutUniform,
                    format!("parameter `{name}` has no matching uniform"),
                )
                .with_span(param.span)
                .with_suggestion(format!(
                    "declare `uniform {} {name};`",
                    param_uniform_types(&param.info.kind)[0]
                )),
            ),
            Some((ty, ty_span, _)) => {
                let accepted = param_uniform_types(&param.info.kind);
                if !accepted.contains(ty) {
                    diagnostics.emit(
                        Diagnostic::warning(
                            DiagnosticCode::ParamTypeMismatch,
                            format!(
                                "uniform `{name}` is `{ty}` but its parameter is declared as `{}`",
                                param.info.kind
                            ),
                        )
                        .with_span(*ty_span)
                        .with_label(param.span, "parameter declared here")
                        .with_suggestion(format!("change the uniform type to `{}`", accepted[0])),
                    );
                }
            }
        }
    }

    for (name, (_, _, name_span)) in &uniforms {
        let declared = params.iter().any(|p| p.info.name == *name)
            || metadata.inputs.iter().any(|input| input.name == *name);
        if !declared {
            diagnostics.emit(
                Diagnostic::info(
                    DiagnosticCode::UniformWithoutParam,
                    format!("uniform `{name}` has no `@param` annotation"),
                )
                .with_span(*name_span)
                .with_suggestion(format!("add `// @param {name} <type>` to expose it")),
            );
        }
    }
}

/// Comment-annotated documents with stage markers.
#[derive(Debug, Default)]
pub struct AnnotatedMappingParser;

impl ShaderParser for AnnotatedMappingParser {
    fn format(&self) -> ShaderFormat {
        ShaderFormat::AnnotatedMapping
    }

    fn parse(&self, source: &str, options: &ParseOptions) -> ParseOutput {
        let index = LineIndex::new(source);
        let mut diagnostics = DiagnosticCollector::new();
        let mut tags = TagCollector {
            source,
            index: &index,
            metadata: AnnotatedMetadata::default(),
            params: Vec::new(),
        };

        let mut markers: Vec<(StageKind, Range<usize>)> = Vec::new();
        for (range, line) in lines(source) {
            match classify(line, range.start) {
                LineKind::Marker(kind) => markers.push((kind, range)),
                LineKind::Tag(at) => tags.collect(at, range.end, &mut diagnostics),
                LineKind::Other => {}
            }
        }

        let section = |kind: StageKind, code: Range<usize>| {
            let map = SourceMap::shifted(&index, code.start);
            parse_stage(
                &source[code.clone()],
                &map,
                kind,
                kind.marker(),
                index.span(code),
                options,
            )
        };

        let mut program = Program::default();
        if markers.is_empty() {
            diagnostics.emit(
                Diagnostic::info(
                    DiagnosticCode::MissingStageMarker,
                    "no stage markers found; treating the whole document as the fragment stage",
                )
                .with_suggestion("add a `// FRAGMENT_SHADER` line before the fragment code"),
            );
            let (stage, stage_diagnostics) = section(StageKind::Fragment, 0..source.len());
            diagnostics.extend(stage_diagnostics);
            program.stages.push(stage);
        } else {
            let preamble = 0..markers[0].1.start;
            let (common, common_diagnostics) = section(StageKind::Common, preamble);
            diagnostics.extend(common_diagnostics);
            if let Some(span) = code_span(&common) {
                diagnostics.emit(
                    Diagnostic::warning(
                        DiagnosticCode::CodeOutsideStage,
                        "code before the first stage marker is shared by every stage",
                    )
                    .with_span(span)
                    .with_suggestion("move it below a stage marker if only one stage needs it"),
                );
                program.stages.push(common);
            }

            let mut seen: IndexMap<StageKind, Span> = IndexMap::new();
            for (i, (kind, marker)) in markers.iter().enumerate() {
                let marker_span = index.span(marker.clone());
                let code_start = (marker.end + 1).min(source.len());
                let code_end = markers
                    .get(i + 1)
                    .map_or(source.len(), |(_, next)| next.start);

                if let Some(first) = seen.get(kind) {
                    diagnostics.emit(
                        Diagnostic::error(
                            DiagnosticCode::DuplicateStage,
                            format!("stage marker `{}` appears more than once", kind.marker()),
                        )
                        .with_span(marker_span)
                        .with_label(*first, "first marker here")
                        .with_suggestion("merge the two sections"),
                    );
                } else {
                    seen.insert(*kind, marker_span);
                }

                let (stage, stage_diagnostics) = section(*kind, code_start..code_end);
                diagnostics.extend(stage_diagnostics);
                if has_code(&stage) {
                    program.stages.push(stage);
                } else {
                    diagnostics.emit(
                        Diagnostic::error(
                            DiagnosticCode::EmptyStage,
                            format!("stage `{}` has no code", kind.marker()),
                        )
                        .with_span(marker_span)
                        .with_suggestion("add the stage's code or remove the marker"),
                    );
                }
            }
        }

        let TagCollector {
            mut metadata,
            params,
            ..
        } = tags;
        cross_check(&program, &params, &metadata, &mut diagnostics);

        program.prelude = metadata
            .inputs
            .iter()
            .map(|input| PreludeSymbol::uniform(input.name.clone(), port_type(&input.kind)))
            .collect();
        metadata.params = params.into_iter().map(|param| param.info).collect();
        metadata.stages = program
            .stages
            .iter()
            .map(|stage| stage.kind)
            .filter(|kind| *kind != StageKind::Common)
            .collect();
        for stage in &program.stages {
            trace!(label = stage.label.as_str(); "Annotated section");
        }
        debug!(
            stages = program.stages.len(),
            params = metadata.params.len();
            "Parsed annotated mapping document"
        );

        ParseOutput {
            program,
            diagnostics: diagnostics.finish(),
            metadata: DocumentMetadata::Annotated(metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> ParseOutput {
        AnnotatedMappingParser.parse(source, &ParseOptions::default())
    }

    fn codes(output: &ParseOutput) -> Vec<DiagnosticCode> {
        output.diagnostics.iter().map(|d| d.code()).collect()
    }

    fn metadata(output: &ParseOutput) -> &AnnotatedMetadata {
        match &output.metadata {
            DocumentMetadata::Annotated(metadata) => metadata,
            other => panic!("expected annotated metadata, got {other:?}"),
        }
    }

    const VALID: &str = "\
// @name Plasma
// @author Someone
// @category Generator
// @param speed float min:0 max:4 default:1 label:\"Speed\"
// @input source texture incoming frame

// VERTEX_SHADER
attribute vec4 position;
void main() { gl_Position = position; }

// FRAGMENT_SHADER
uniform float speed;
void main() { gl_FragColor = vec4(speed); }
";

    #[test]
    fn test_valid_document() {
        let output = parse(VALID);

        assert!(output.diagnostics.is_empty(), "{:#?}", output.diagnostics);
        let kinds: Vec<_> = output.program.stages.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, [StageKind::Vertex, StageKind::Fragment]);

        let metadata = metadata(&output);
        assert_eq!(metadata.name.as_deref(), Some("Plasma"));
        assert_eq!(metadata.categories, ["Generator"]);
        assert_eq!(metadata.params[0].default, Some(ParamValue::Number(1.0)));
        assert_eq!(metadata.params[0].label.as_deref(), Some("Speed"));
        assert_eq!(
            metadata.inputs[0].description.as_deref(),
            Some("incoming frame")
        );
        assert_eq!(output.program.prelude[0].name, "source");
    }

    #[test]
    fn test_sections_keep_document_positions() {
        let source = "// FRAGMENT_SHADER\nvoid main() {\n  float x = 1.0 $;\n}\n";
        let output = parse(source);

        assert_eq!(codes(&output), [DiagnosticCode::InvalidToken]);
        let span = output.diagnostics[0].span().unwrap();
        assert_eq!(&source[span.range()], "$");
        assert_eq!(span.start().line, 3);
        assert_eq!(span.start().column, 17);
    }

    #[test]
    fn test_missing_markers() {
        let output = parse("void main() { gl_FragColor = vec4(1.0); }");

        assert_eq!(codes(&output), [DiagnosticCode::MissingStageMarker]);
        assert!(output.diagnostics[0].severity().is_info());
        assert_eq!(output.program.stages[0].kind, StageKind::Fragment);
    }

    #[test]
    fn test_duplicate_and_empty_stages() {
        let source = "// FRAGMENT_SHADER\nvoid main() {}\n// VERTEX_SHADER\n// FRAGMENT_SHADER\nvoid main() {}\n";
        let output = parse(source);

        assert_eq!(
            codes(&output),
            [DiagnosticCode::EmptyStage, DiagnosticCode::DuplicateStage]
        );
        assert_eq!(output.diagnostics[0].span().unwrap().start().line, 3);
        assert_eq!(output.diagnostics[1].labels().len(), 1);
        assert_eq!(output.program.stages.len(), 2);
    }

    #[test]
    fn test_code_outside_stage_becomes_common() {
        let source = "float helper(float x) { return x; }\n// FRAGMENT_SHADER\nvoid main() {}\n";
        let output = parse(source);

        assert_eq!(codes(&output), [DiagnosticCode::CodeOutsideStage]);
        assert_eq!(output.program.stages[0].kind, StageKind::Common);
        assert_eq!(output.diagnostics[0].span().unwrap().start().line, 1);
    }

    #[test]
    fn test_tag_problems() {
        let source = "\
// @param level float min:5 max:1
// @param mode double
// @license MIT
// FRAGMENT_SHADER
uniform float level;
void main() {}
";
        let output = parse(source);

        assert_eq!(
            codes(&output),
            [
                DiagnosticCode::InvalidParameterRange,
                DiagnosticCode::InvalidTag,
                DiagnosticCode::UnknownTag
            ]
        );
        let invalid = output.diagnostics[1].span().unwrap();
        assert_eq!(&source[invalid.range()], "double");
    }

    #[test]
    fn test_bare_tag_spans_the_tag() {
        let source = "// @param\n// FRAGMENT_SHADER\nvoid main() {}\n";
        let output = parse(source);

        let invalid = output
            .diagnostics
            .iter()
            .find(|d| d.code() == DiagnosticCode::InvalidTag)
            .and_then(Diagnostic::span)
            .unwrap();
        assert_eq!(&source[invalid.range()], "@param");
    }

    #[test]
    fn test_param_cross_check() {
        let source = "\
// @param speed float
// @param tint color
// FRAGMENT_SHADER
uniform int tint;
uniform float extra;
void main() {}
";
        let output = parse(source);

        assert_eq!(
            codes(&output),
            [
                DiagnosticCode::ParamWithoutUniform,
                DiagnosticCode::ParamTypeMismatch,
                DiagnosticCode::UniformWithoutParam
            ]
        );
        let missing = output.diagnostics[0].span().unwrap();
        assert_eq!(&source[missing.range()], "@param speed float");
        let mismatch = output.diagnostics[1].span().unwrap();
        assert_eq!(&source[mismatch.range()], "int");
        let extra = output.diagnostics[2].span().unwrap();
        assert_eq!(&source[extra.range()], "extra");
        assert!(output.diagnostics[2].severity().is_info());
    }
}
