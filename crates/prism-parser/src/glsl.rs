//! Core-language front end.
//!
//! [`parse_stage`] runs the lexer, directive parser and grammar over one code
//! fragment and assembles a [`Stage`]. The delegating dialects call it with a
//! [`SourceMap`] that places the fragment inside their document.

use log::{debug, trace};

use prism_core::{
    Diagnostic, DiagnosticCode, DiagnosticCollector, LineIndex, Span, Spanned,
    ast::{
        Comment, CommentKind, Delimiter, DelimiterKind, ExtensionDirective, MacroDefinition,
        Program, Stage, StageKind, VersionDirective,
    },
    metadata::{CoreMetadata, DocumentMetadata, UniformInfo},
};

use crate::{
    ParseOptions, ParseOutput, ShaderParser,
    directive::{Directive, parse_directive},
    lexer::tokenize,
    parser::Parser,
    source_map::SourceMap,
    tokens::{PositionedToken, Punct, Token},
};

fn delimiter(token: &Token<'_>) -> Option<(DelimiterKind, bool)> {
    match token {
        Token::Punct(Punct::LeftParen) => Some((DelimiterKind::Paren, true)),
        Token::Punct(Punct::RightParen) => Some((DelimiterKind::Paren, false)),
        Token::Punct(Punct::LeftBracket) => Some((DelimiterKind::Bracket, true)),
        Token::Punct(Punct::RightBracket) => Some((DelimiterKind::Bracket, false)),
        Token::Punct(Punct::LeftBrace) => Some((DelimiterKind::Brace, true)),
        Token::Punct(Punct::RightBrace) => Some((DelimiterKind::Brace, false)),
        _ => None,
    }
}

/// Records directives into the stage as they appear in the token stream.
struct DirectiveRecorder<'m, 'doc> {
    map: &'m SourceMap<'doc>,
    /// Whether anything other than trivia has been seen.
    seen_code: bool,
}

impl DirectiveRecorder<'_, '_> {
    fn record(
        &mut self,
        token: &PositionedToken<'_>,
        text: &str,
        stage: &mut Stage,
        diagnostics: &mut DiagnosticCollector,
    ) {
        // The directive text starts right after `#`.
        let base = token.local.start + 1;
        let span_of =
            |range: std::ops::Range<usize>| self.map.span(base + range.start..base + range.end);

        match parse_directive(text) {
            Ok(Directive::Version { number, profile }) => {
                if self.seen_code {
                    diagnostics.emit(
                        Diagnostic::error(
                            DiagnosticCode::MisplacedVersion,
                            "`#version` must come before anything else",
                        )
                        .with_span(token.span)
                        .with_suggestion("move the `#version` line to the top of the shader"),
                    );
                } else if stage.version.is_none() {
                    stage.version = Some(VersionDirective {
                        number,
                        profile,
                        span: token.span,
                    });
                }
            }
            Ok(Directive::Extension {
                name,
                name_range,
                behavior,
            }) => stage.extensions.push(ExtensionDirective {
                name: Spanned::new(name.to_string(), span_of(name_range)),
                behavior,
                span: token.span,
            }),
            Ok(Directive::Define {
                name,
                name_range,
                params,
            }) => stage.macros.push(MacroDefinition {
                name: Spanned::new(name.to_string(), span_of(name_range)),
                params: params.map(|params| params.into_iter().map(str::to_string).collect()),
                span: token.span,
            }),
            Ok(Directive::Recorded(name)) => trace!(name; "Recorded directive"),
            Ok(Directive::Null) => {}
            Err(err) => {
                let diagnostic = if err.code == DiagnosticCode::UnknownDirective {
                    Diagnostic::warning(err.code, err.message)
                        .with_suggestion("remove the directive or replace it with a supported one")
                } else {
                    Diagnostic::error(err.code, err.message)
                };
                diagnostics.emit(diagnostic.with_span(span_of(err.range)));
            }
        }
        self.seen_code = true;
    }
}

/// Parse one code fragment into a stage.
///
/// `text` is the fragment; `map` places it in the submitted document and
/// `span` is the stage's extent there.
pub fn parse_stage(
    text: &str,
    map: &SourceMap<'_>,
    kind: StageKind,
    label: &str,
    span: Span,
    options: &ParseOptions,
) -> (Stage, Vec<Diagnostic>) {
    let mut stage = Stage::new(kind, label, span);
    let mut diagnostics = DiagnosticCollector::new();

    let (tokens, lexer_diagnostics) = tokenize(text, map);
    diagnostics.extend(lexer_diagnostics);

    let mut recorder = DirectiveRecorder {
        map,
        seen_code: false,
    };
    let mut significant = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token.token {
            Token::Whitespace | Token::Newline => {}
            Token::LineComment(_) => stage.comments.push(Comment {
                kind: CommentKind::Line,
                span: token.span,
            }),
            Token::BlockComment { terminated, .. } => stage.comments.push(Comment {
                kind: CommentKind::Block { terminated },
                span: token.span,
            }),
            Token::Directive(directive) => {
                recorder.record(&token, directive, &mut stage, &mut diagnostics);
            }
            _ => {
                if let Some((kind, is_open)) = delimiter(&token.token) {
                    stage.delimiters.push(Delimiter {
                        kind,
                        is_open,
                        span: token.span,
                    });
                }
                recorder.seen_code = true;
                significant.push(token);
            }
        }
    }

    let end = significant.last().map_or(span, |token| token.span);
    let declarations = Parser::new(&significant, end, options).parse(&mut diagnostics);
    debug!(
        label,
        tokens = significant.len(),
        declarations = declarations.len();
        "Parsed stage"
    );
    for declaration in declarations {
        stage.push_declaration(declaration);
    }

    (stage, diagnostics.finish())
}

/// Facts a caller may want about a core-language stage.
pub(crate) fn core_metadata(stage: &Stage) -> CoreMetadata {
    CoreMetadata {
        version: stage.version.map(|version| match version.profile {
            Some(profile) => format!("{} {}", version.number, profile.as_str()),
            None => version.number.to_string(),
        }),
        extensions: stage
            .extensions
            .iter()
            .map(|ext| ext.name.inner().clone())
            .collect(),
        uniforms: stage
            .uniforms()
            .map(|uniform| UniformInfo {
                name: uniform.name.inner().clone(),
                ty: uniform.ty.inner().to_string(),
            })
            .collect(),
        functions: stage
            .function_definitions()
            .map(|function| function.name.inner().clone())
            .collect(),
    }
}

/// Plain core-language documents.
#[derive(Debug, Default)]
pub struct CoreLanguageParser;

impl ShaderParser for CoreLanguageParser {
    fn format(&self) -> prism_core::ShaderFormat {
        prism_core::ShaderFormat::CoreLanguage
    }

    fn parse(&self, source: &str, options: &ParseOptions) -> ParseOutput {
        let index = LineIndex::new(source);
        let map = SourceMap::identity(&index);
        let (stage, diagnostics) = parse_stage(
            source,
            &map,
            StageKind::Generic,
            StageKind::Generic.marker(),
            index.full_span(),
            options,
        );
        let metadata = DocumentMetadata::Core(core_metadata(&stage));
        ParseOutput {
            program: Program {
                stages: vec![stage],
                prelude: Vec::new(),
            },
            diagnostics,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::ast::{DeclarationKind, ExtensionBehavior, Profile};

    fn stage(source: &str) -> (Stage, Vec<Diagnostic>) {
        let index = LineIndex::new(source);
        let map = SourceMap::identity(&index);
        parse_stage(
            source,
            &map,
            StageKind::Generic,
            "SHADER",
            index.full_span(),
            &ParseOptions::default(),
        )
    }

    #[test]
    fn test_records_version_and_extensions() {
        let (stage, diagnostics) = stage(
            "#version 300 es\n#extension GL_OES_standard_derivatives : enable\nvoid main() {}\n",
        );

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let version = stage.version.unwrap();
        assert_eq!(version.number, 300);
        assert_eq!(version.profile, Some(Profile::Es));
        assert_eq!(stage.extensions.len(), 1);
        assert_eq!(stage.extensions[0].behavior, ExtensionBehavior::Enable);
        assert_eq!(stage.extensions[0].name.span().range(), 27..54);
        assert!(stage.functions.contains_key("main"));
    }

    #[test]
    fn test_misplaced_version() {
        let (stage, diagnostics) = stage("float x;\n#version 330\n");

        assert!(stage.version.is_none());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), DiagnosticCode::MisplacedVersion);
        assert_eq!(diagnostics[0].span().unwrap().start().line, 2);
    }

    #[test]
    fn test_version_after_comment_is_fine() {
        let (stage, diagnostics) = stage("// header\n/* block */\n#version 330\n");

        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(stage.version.map(|v| v.number), Some(330));
        assert_eq!(stage.comments.len(), 2);
    }

    #[test]
    fn test_unknown_directive_is_warning() {
        let source = "#include \"lib.glsl\"\nvoid main() {}";
        let (_, diagnostics) = stage(source);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code(), DiagnosticCode::UnknownDirective);
        assert!(diagnostics[0].severity().is_warning());
        let range = diagnostics[0].span().unwrap().range();
        assert_eq!(&source[range], "include");
    }

    #[test]
    fn test_define_records_macro() {
        let (stage, diagnostics) = stage("#define PI 3.14159\n#define SQ(x) ((x) * (x))\n");

        assert!(diagnostics.is_empty());
        let names: Vec<_> = stage.macros.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["PI", "SQ"]);
        assert_eq!(stage.macros[1].params, Some(vec!["x".to_string()]));
    }

    #[test]
    fn test_records_delimiters_in_order() {
        let (stage, _) = stage("void main() { a[0]; }");

        let kinds: Vec<_> = stage
            .delimiters
            .iter()
            .map(|d| (d.kind.open_char(), d.is_open))
            .collect();
        assert_eq!(
            kinds,
            [
                ('(', true),
                ('(', false),
                ('{', true),
                ('[', true),
                ('[', false),
                ('{', false)
            ]
        );
    }

    #[test]
    fn test_core_parser_metadata() {
        let output = CoreLanguageParser.parse(
            "#version 330 core\nuniform float time;\nvoid main() {}\n",
            &ParseOptions::default(),
        );

        let DocumentMetadata::Core(metadata) = output.metadata else {
            panic!("expected core metadata");
        };
        assert_eq!(metadata.version.as_deref(), Some("330 core"));
        assert_eq!(metadata.uniforms[0].name, "time");
        assert_eq!(metadata.uniforms[0].ty, "float");
        assert_eq!(metadata.functions, ["main"]);
        assert!(matches!(
            output.program.stages[0].declarations[0].kind,
            DeclarationKind::Variable(_)
        ));
    }
}
