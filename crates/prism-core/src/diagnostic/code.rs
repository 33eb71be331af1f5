//! Stable diagnostic codes.
//!
//! Codes are grouped by the phase that produces them. The string form returned
//! by [`DiagnosticCode::as_str`] is part of the public output and never changes
//! once published; automated consumers match on it.

use std::fmt;

use serde::{Serialize, Serializer};

/// Diagnostic codes for categorizing reported issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCode {
    // =========================================================================
    // Input and orchestration
    // =========================================================================
    /// The submitted source is empty or whitespace only.
    EmptySource,

    /// The format tag does not name a registered dialect.
    UnsupportedFormat,

    /// The source exceeds the configured size limit.
    SourceTooLarge,

    /// The wall-clock budget ran out before every pass completed.
    ValidationTimeout,

    // =========================================================================
    // Lexer
    // =========================================================================
    /// A character that starts no token.
    InvalidToken,

    /// A `/*` comment with no closing `*/`.
    UnterminatedComment,

    /// A malformed numeric literal such as `0x` or `1e`.
    InvalidNumber,

    // =========================================================================
    // Parser
    // =========================================================================
    /// The parser met a token it did not expect.
    SyntaxError,

    /// A statement or declaration is missing its `;`.
    MissingTerminator,

    /// The input ended inside a construct.
    UnexpectedEof,

    /// A `#` directive the front end does not know.
    UnknownDirective,

    /// `#version` appears after other tokens.
    MisplacedVersion,

    // =========================================================================
    // Syntax checker
    // =========================================================================
    /// A bracket, brace or parenthesis without its partner.
    UnbalancedDelimiter,

    // =========================================================================
    // Interactive JSON dialect
    // =========================================================================
    /// The document is not valid JSON.
    InvalidJson,

    /// A required top-level key is absent.
    MissingRequiredKey,

    /// A key holds a value of the wrong shape.
    InvalidStructure,

    /// Two render passes write the same target buffer.
    DuplicatePassTarget,

    /// A persistent pass has no target buffer to persist.
    PersistentPassWithoutTarget,

    /// A parameter declaration is missing its name or has an unknown type.
    InvalidParameter,

    /// Two parameters share a name.
    DuplicateParameter,

    /// A parameter uses a name the host reserves.
    ReservedParameterName,

    /// A parameter's minimum exceeds its maximum, or its default lies outside.
    InvalidParameterRange,

    /// A parameter default does not match the parameter type.
    InvalidParameterDefault,

    /// Descriptive metadata is absent.
    MissingMetadata,

    // =========================================================================
    // Annotated mapping dialect
    // =========================================================================
    /// No stage marker was found; the whole text is treated as a fragment stage.
    MissingStageMarker,

    /// The same stage marker appears twice.
    DuplicateStage,

    /// A stage marker is followed by no code.
    EmptyStage,

    /// Code appears before the first stage marker.
    CodeOutsideStage,

    /// An annotation tag is malformed.
    InvalidTag,

    /// An annotation tag is not recognized.
    UnknownTag,

    /// A declared parameter has no matching uniform.
    ParamWithoutUniform,

    /// A uniform has no matching parameter annotation.
    UniformWithoutParam,

    /// A parameter annotation and its uniform disagree on type.
    ParamTypeMismatch,

    // =========================================================================
    // Semantic checker
    // =========================================================================
    /// An identifier or function that resolves to no declaration.
    UndefinedReference,

    /// A call passes the wrong number of arguments.
    ArityMismatch,

    /// Operand or assignment types are incompatible.
    TypeMismatch,

    /// A name is declared twice in the same scope.
    Redefinition,

    /// A declaration hides a built-in.
    BuiltinShadowing,

    /// A function redefines a built-in with an incompatible signature.
    BuiltinRedefinition,

    /// A user declaration uses the reserved `gl_` prefix.
    ReservedIdentifier,

    /// A swizzle selects components the operand does not have.
    InvalidSwizzle,

    /// A struct has no member with the accessed name.
    UnknownMember,

    /// A write to a `const` or `uniform` value.
    ReadOnlyAssignment,

    /// An executable stage defines no `main`.
    MissingEntryPoint,

    // =========================================================================
    // Control and data flow
    // =========================================================================
    /// Statements that can never execute.
    UnreachableCode,

    /// A loop with a constant-true condition and no reachable exit.
    InfiniteLoop,

    /// A variable read before any assignment reaches it.
    UseBeforeInit,

    /// A value assigned and never read afterwards.
    DeadStore,

    /// A divisor that is provably the constant zero.
    DivByZeroRisk,

    /// A non-void function that can finish without returning a value.
    MissingReturn,

    // =========================================================================
    // Portability
    // =========================================================================
    /// A feature unavailable at the effective language version.
    VersionIncompatible,

    /// A vendor-specific extension.
    NonPortableExtension,

    /// A `#version` number that no language revision defines.
    UnsupportedVersion,

    /// No version was declared and one had to be inferred.
    MissingVersion,

    /// The version was inferred from the features in use.
    VersionInferred,

    /// The in-source `#version` disagrees with the requested version.
    VersionConflict,

    /// A feature that still works but is deprecated at this version.
    DeprecatedFeature,

    /// An ES fragment stage lacks a default float precision.
    MissingPrecision,

    // =========================================================================
    // Quality
    // =========================================================================
    /// A function's cyclomatic complexity exceeds the threshold.
    HighComplexity,

    /// A name deviates from the configured naming pattern.
    NamingConvention,
}

impl DiagnosticCode {
    /// The stable string identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptySource => "EMPTY_SOURCE",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::SourceTooLarge => "SOURCE_TOO_LARGE",
            Self::ValidationTimeout => "VALIDATION_TIMEOUT",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::UnterminatedComment => "UNTERMINATED_COMMENT",
            Self::InvalidNumber => "INVALID_NUMBER",
            Self::SyntaxError => "SYNTAX_ERROR",
            Self::MissingTerminator => "MISSING_TERMINATOR",
            Self::UnexpectedEof => "UNEXPECTED_EOF",
            Self::UnknownDirective => "UNKNOWN_DIRECTIVE",
            Self::MisplacedVersion => "MISPLACED_VERSION",
            Self::UnbalancedDelimiter => "UNBALANCED_DELIMITER",
            Self::InvalidJson => "INVALID_JSON",
            Self::MissingRequiredKey => "MISSING_REQUIRED_KEY",
            Self::InvalidStructure => "INVALID_STRUCTURE",
            Self::DuplicatePassTarget => "DUPLICATE_PASS_TARGET",
            Self::PersistentPassWithoutTarget => "PERSISTENT_PASS_WITHOUT_TARGET",
            Self::InvalidParameter => "INVALID_PARAMETER",
            Self::DuplicateParameter => "DUPLICATE_PARAMETER",
            Self::ReservedParameterName => "RESERVED_PARAMETER_NAME",
            Self::InvalidParameterRange => "INVALID_PARAMETER_RANGE",
            Self::InvalidParameterDefault => "INVALID_PARAMETER_DEFAULT",
            Self::MissingMetadata => "MISSING_METADATA",
            Self::MissingStageMarker => "MISSING_STAGE_MARKER",
            Self::DuplicateStage => "DUPLICATE_STAGE",
            Self::EmptyStage => "EMPTY_STAGE",
            Self::CodeOutsideStage => "CODE_OUTSIDE_STAGE",
            Self::InvalidTag => "INVALID_TAG",
            Self::UnknownTag => "UNKNOWN_TAG",
            Self::ParamWithoutUniform => "PARAM_WITHOUT_UNIFORM",
            Self::UniformWithoutParam => "UNIFORM_WITHOUT_PARAM",
            Self::ParamTypeMismatch => "PARAM_TYPE_MISMATCH",
            Self::UndefinedReference => "UNDEFINED_REFERENCE",
            Self::ArityMismatch => "ARITY_MISMATCH",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::Redefinition => "REDEFINITION",
            Self::BuiltinShadowing => "BUILTIN_SHADOWING",
            Self::BuiltinRedefinition => "BUILTIN_REDEFINITION",
            Self::ReservedIdentifier => "RESERVED_IDENTIFIER",
            Self::InvalidSwizzle => "INVALID_SWIZZLE",
            Self::UnknownMember => "UNKNOWN_MEMBER",
            Self::ReadOnlyAssignment => "READ_ONLY_ASSIGNMENT",
            Self::MissingEntryPoint => "MISSING_ENTRY_POINT",
            Self::UnreachableCode => "UNREACHABLE_CODE",
            Self::InfiniteLoop => "INFINITE_LOOP",
            Self::UseBeforeInit => "USE_BEFORE_INIT",
            Self::DeadStore => "DEAD_STORE",
            Self::DivByZeroRisk => "DIV_BY_ZERO_RISK",
            Self::MissingReturn => "MISSING_RETURN",
            Self::VersionIncompatible => "VERSION_INCOMPATIBLE",
            Self::NonPortableExtension => "NON_PORTABLE_EXTENSION",
            Self::UnsupportedVersion => "UNSUPPORTED_VERSION",
            Self::MissingVersion => "MISSING_VERSION",
            Self::VersionInferred => "VERSION_INFERRED",
            Self::VersionConflict => "VERSION_CONFLICT",
            Self::DeprecatedFeature => "DEPRECATED_FEATURE",
            Self::MissingPrecision => "MISSING_PRECISION",
            Self::HighComplexity => "HIGH_COMPLEXITY",
            Self::NamingConvention => "NAMING_CONVENTION",
        }
    }

    /// Short description for documentation and labels.
    pub fn description(&self) -> &'static str {
        match self {
            Self::EmptySource => "empty source",
            Self::UnsupportedFormat => "unsupported format",
            Self::SourceTooLarge => "source too large",
            Self::ValidationTimeout => "validation timed out",
            Self::InvalidToken => "unexpected character",
            Self::UnterminatedComment => "unterminated block comment",
            Self::InvalidNumber => "malformed numeric literal",
            Self::SyntaxError => "unexpected token",
            Self::MissingTerminator => "missing `;`",
            Self::UnexpectedEof => "unexpected end of input",
            Self::UnknownDirective => "unknown directive",
            Self::MisplacedVersion => "misplaced `#version`",
            Self::UnbalancedDelimiter => "unbalanced delimiter",
            Self::InvalidJson => "invalid JSON",
            Self::MissingRequiredKey => "missing required key",
            Self::InvalidStructure => "invalid document structure",
            Self::DuplicatePassTarget => "duplicate pass target",
            Self::PersistentPassWithoutTarget => "persistent pass without target",
            Self::InvalidParameter => "invalid parameter",
            Self::DuplicateParameter => "duplicate parameter",
            Self::ReservedParameterName => "reserved parameter name",
            Self::InvalidParameterRange => "invalid parameter range",
            Self::InvalidParameterDefault => "invalid parameter default",
            Self::MissingMetadata => "missing metadata",
            Self::MissingStageMarker => "missing stage marker",
            Self::DuplicateStage => "duplicate stage",
            Self::EmptyStage => "empty stage",
            Self::CodeOutsideStage => "code outside any stage",
            Self::InvalidTag => "invalid annotation",
            Self::UnknownTag => "unknown annotation",
            Self::ParamWithoutUniform => "parameter without uniform",
            Self::UniformWithoutParam => "uniform without parameter",
            Self::ParamTypeMismatch => "parameter type mismatch",
            Self::UndefinedReference => "undefined reference",
            Self::ArityMismatch => "wrong number of arguments",
            Self::TypeMismatch => "type mismatch",
            Self::Redefinition => "redefinition",
            Self::BuiltinShadowing => "shadows a built-in",
            Self::BuiltinRedefinition => "redefines a built-in",
            Self::ReservedIdentifier => "reserved identifier",
            Self::InvalidSwizzle => "invalid swizzle",
            Self::UnknownMember => "unknown member",
            Self::ReadOnlyAssignment => "assignment to read-only value",
            Self::MissingEntryPoint => "missing `main`",
            Self::UnreachableCode => "unreachable code",
            Self::InfiniteLoop => "infinite loop",
            Self::UseBeforeInit => "used before initialization",
            Self::DeadStore => "value never read",
            Self::DivByZeroRisk => "division by zero",
            Self::MissingReturn => "missing return",
            Self::VersionIncompatible => "unavailable at this version",
            Self::NonPortableExtension => "vendor-specific extension",
            Self::UnsupportedVersion => "unsupported version",
            Self::MissingVersion => "missing `#version`",
            Self::VersionInferred => "version inferred",
            Self::VersionConflict => "conflicting versions",
            Self::DeprecatedFeature => "deprecated feature",
            Self::MissingPrecision => "missing precision",
            Self::HighComplexity => "high complexity",
            Self::NamingConvention => "naming convention",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
