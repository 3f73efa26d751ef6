//! Extension → comment syntax table.
//!
//! Every entry is static data. Files whose extension is unknown are treated as
//! plain text and scanned like markdown.

use serde::Serialize;
use std::path::Path;

/// Block comment delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockComment {
    /// Opening token, e.g. `/*`.
    pub start: &'static str,
    /// Closing token, e.g. `*/`.
    pub end: &'static str,
    /// Decoration repeated at the start of interior lines, e.g. `*`.
    pub ignore: Option<&'static str>,
}

/// Comment syntax descriptor for one language.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Language {
    /// Display name.
    pub name: &'static str,
    /// Line comment token.
    pub line: Option<&'static str>,
    /// Block comment tokens.
    pub block: Option<BlockComment>,
    /// Characters that open string literals.
    pub quotes: &'static [char],
}

impl Language {
    /// Whether the file is scanned through its comments only.
    #[must_use]
    pub const fn is_code(&self) -> bool {
        self.line.is_some() || self.block.is_some()
    }

    /// Whether the language is markdown (or plain text scanned like markdown).
    #[must_use]
    pub const fn is_markdown(&self) -> bool {
        !self.is_code()
    }
}

const C_BLOCK: BlockComment = BlockComment {
    start: "/*",
    end: "*/",
    ignore: Some("*"),
};

const HTML_BLOCK: BlockComment = BlockComment {
    start: "<!--",
    end: "-->",
    ignore: None,
};

const fn c_like(name: &'static str, quotes: &'static [char]) -> Language {
    Language {
        name,
        line: Some("//"),
        block: Some(C_BLOCK),
        quotes,
    }
}

const fn line_only(name: &'static str, token: &'static str, quotes: &'static [char]) -> Language {
    Language {
        name,
        line: Some(token),
        block: None,
        quotes,
    }
}

const fn with_block(
    name: &'static str,
    line: Option<&'static str>,
    start: &'static str,
    end: &'static str,
    quotes: &'static [char],
) -> Language {
    Language {
        name,
        line,
        block: Some(BlockComment {
            start,
            end,
            ignore: None,
        }),
        quotes,
    }
}

const DQ: &[char] = &['"'];
const DQ_SQ: &[char] = &['"', '\''];
const JS_QUOTES: &[char] = &['"', '\'', '`'];
const NONE: &[char] = &[];

/// Markdown documents.
pub static MARKDOWN: Language = Language {
    name: "markdown",
    line: None,
    block: None,
    quotes: NONE,
};

/// Files with no known comment syntax.
pub static PLAIN_TEXT: Language = Language {
    name: "text",
    line: None,
    block: None,
    quotes: NONE,
};

static JAVASCRIPT: Language = c_like("javascript", JS_QUOTES);
static TYPESCRIPT: Language = c_like("typescript", JS_QUOTES);
static JAVA: Language = c_like("java", DQ_SQ);
static C: Language = c_like("c", DQ_SQ);
static CPP: Language = c_like("c++", DQ_SQ);
static CSHARP: Language = c_like("c#", DQ_SQ);
static GO: Language = c_like("go", &['"', '\'', '`']);
static RUST: Language = c_like("rust", DQ);
static SWIFT: Language = c_like("swift", DQ);
static KOTLIN: Language = c_like("kotlin", DQ_SQ);
static SCALA: Language = c_like("scala", DQ_SQ);
static DART: Language = c_like("dart", DQ_SQ);
static PHP: Language = c_like("php", DQ_SQ);
static OBJC: Language = c_like("objective-c", DQ_SQ);
static GROOVY: Language = c_like("groovy", DQ_SQ);
static SCSS: Language = c_like("scss", DQ_SQ);
static LESS: Language = c_like("less", DQ_SQ);
static PROTOBUF: Language = c_like("protobuf", DQ_SQ);
static SOLIDITY: Language = c_like("solidity", DQ_SQ);
static ZIG: Language = line_only("zig", "//", DQ_SQ);
static CSS: Language = Language {
    name: "css",
    line: None,
    block: Some(C_BLOCK),
    quotes: DQ_SQ,
};
static PYTHON: Language = line_only("python", "#", DQ_SQ);
static RUBY: Language = line_only("ruby", "#", DQ_SQ);
static SHELL: Language = line_only("shell", "#", DQ_SQ);
static PERL: Language = line_only("perl", "#", DQ_SQ);
static R: Language = line_only("r", "#", DQ_SQ);
static YAML: Language = line_only("yaml", "#", DQ_SQ);
static TOML: Language = line_only("toml", "#", DQ_SQ);
static ELIXIR: Language = line_only("elixir", "#", DQ_SQ);
static CRYSTAL: Language = line_only("crystal", "#", DQ);
static NIM: Language = line_only("nim", "#", DQ);
static POWERSHELL: Language = with_block("powershell", Some("#"), "<#", "#>", DQ_SQ);
static COFFEESCRIPT: Language = with_block("coffeescript", Some("#"), "###", "###", DQ_SQ);
static JULIA: Language = with_block("julia", Some("#"), "#=", "=#", DQ);
static DOCKERFILE: Language = line_only("dockerfile", "#", DQ_SQ);
static MAKEFILE: Language = line_only("makefile", "#", DQ_SQ);
static SQL: Language = Language {
    name: "sql",
    line: Some("--"),
    block: Some(C_BLOCK),
    quotes: DQ_SQ,
};
static LUA: Language = with_block("lua", Some("--"), "--[[", "]]", DQ_SQ);
static HASKELL: Language = with_block("haskell", Some("--"), "{-", "-}", DQ);
static ELM: Language = with_block("elm", Some("--"), "{-", "-}", DQ);
static ADA: Language = line_only("ada", "--", DQ);
static VHDL: Language = line_only("vhdl", "--", DQ);
static ERLANG: Language = line_only("erlang", "%", DQ);
static LATEX: Language = line_only("latex", "%", NONE);
static MATLAB: Language = with_block("matlab", Some("%"), "%{", "%}", DQ_SQ);
static CLOJURE: Language = line_only("clojure", ";", DQ);
static LISP: Language = line_only("lisp", ";", DQ);
static ASSEMBLY: Language = line_only("assembly", ";", DQ_SQ);
static INI: Language = line_only("ini", ";", NONE);
static VISUAL_BASIC: Language = line_only("visual basic", "'", DQ);
static FORTRAN: Language = line_only("fortran", "!", DQ_SQ);
static OCAML: Language = with_block("ocaml", None, "(*", "*)", DQ);
static FSHARP: Language = with_block("f#", Some("//"), "(*", "*)", DQ);
static PASCAL: Language = with_block("pascal", Some("//"), "{", "}", &['\'']);
static HTML: Language = Language {
    name: "html",
    line: None,
    block: Some(HTML_BLOCK),
    quotes: NONE,
};
static XML: Language = Language {
    name: "xml",
    line: None,
    block: Some(HTML_BLOCK),
    quotes: NONE,
};
static VUE: Language = Language {
    name: "vue",
    line: Some("//"),
    block: Some(HTML_BLOCK),
    quotes: JS_QUOTES,
};

/// Resolve the language for a file extension (case-insensitive).
#[must_use]
pub fn for_extension(ext: &str) -> &'static Language {
    match ext.to_ascii_lowercase().as_str() {
        "md" | "markdown" | "mdown" | "mkd" | "mdx" => &MARKDOWN,
        "js" | "jsx" | "mjs" | "cjs" => &JAVASCRIPT,
        "ts" | "tsx" | "mts" | "cts" => &TYPESCRIPT,
        "java" => &JAVA,
        "c" | "h" => &C,
        "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" | "ino" => &CPP,
        "cs" => &CSHARP,
        "go" => &GO,
        "rs" => &RUST,
        "swift" => &SWIFT,
        "kt" | "kts" => &KOTLIN,
        "scala" | "sc" => &SCALA,
        "dart" => &DART,
        "php" => &PHP,
        "m" | "mm" => &OBJC,
        "groovy" | "gradle" => &GROOVY,
        "scss" => &SCSS,
        "less" => &LESS,
        "proto" => &PROTOBUF,
        "sol" => &SOLIDITY,
        "zig" => &ZIG,
        "css" => &CSS,
        "py" | "pyw" => &PYTHON,
        "rb" | "rake" | "gemspec" => &RUBY,
        "sh" | "bash" | "zsh" | "fish" => &SHELL,
        "pl" | "pm" => &PERL,
        "r" => &R,
        "yml" | "yaml" => &YAML,
        "toml" => &TOML,
        "ex" | "exs" => &ELIXIR,
        "cr" => &CRYSTAL,
        "nim" => &NIM,
        "ps1" | "psm1" => &POWERSHELL,
        "coffee" => &COFFEESCRIPT,
        "jl" => &JULIA,
        "dockerfile" => &DOCKERFILE,
        "mk" | "mak" => &MAKEFILE,
        "sql" => &SQL,
        "lua" => &LUA,
        "hs" => &HASKELL,
        "elm" => &ELM,
        "ada" | "adb" | "ads" => &ADA,
        "vhd" | "vhdl" => &VHDL,
        "erl" | "hrl" => &ERLANG,
        "tex" | "sty" => &LATEX,
        "matlab" => &MATLAB,
        "clj" | "cljs" | "cljc" | "edn" => &CLOJURE,
        "lisp" | "el" | "scm" | "rkt" => &LISP,
        "asm" | "s" => &ASSEMBLY,
        "ini" | "cfg" => &INI,
        "vb" | "vbs" | "bas" => &VISUAL_BASIC,
        "f" | "f90" | "f95" | "f03" => &FORTRAN,
        "ml" | "mli" => &OCAML,
        "fs" | "fsi" | "fsx" => &FSHARP,
        "pas" | "pp" => &PASCAL,
        "html" | "htm" | "xhtml" => &HTML,
        "xml" | "svg" | "xsd" | "plist" => &XML,
        "vue" | "svelte" => &VUE,
        _ => &PLAIN_TEXT,
    }
}

/// Resolve the language for a path, honouring well-known extension-less names.
#[must_use]
pub fn for_path(path: &Path) -> &'static Language {
    match path.file_name().and_then(|name| name.to_str()) {
        Some("Dockerfile") => return &DOCKERFILE,
        Some("Makefile" | "makefile" | "GNUmakefile") => return &MAKEFILE,
        Some("Rakefile" | "Gemfile") => return &RUBY,
        _ => {}
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(&PLAIN_TEXT, for_extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_resolve_case_insensitively() {
        assert_eq!(for_extension("JS").name, "javascript");
        assert_eq!(for_extension("Md").name, "markdown");
        assert_eq!(for_extension("py").line, Some("#"));
    }

    #[test]
    fn unknown_extensions_fall_back_to_plain_text() {
        let lang = for_extension("unknown-ext");
        assert_eq!(lang.name, "text");
        assert!(lang.is_markdown());
    }

    #[test]
    fn path_lookup_knows_extensionless_files() {
        assert_eq!(for_path(Path::new("build/Dockerfile")).name, "dockerfile");
        assert_eq!(for_path(Path::new("Makefile")).name, "makefile");
        assert_eq!(for_path(Path::new("src/main.rs")).name, "rust");
        assert_eq!(for_path(Path::new("README")).name, "text");
    }

    #[test]
    fn block_only_languages_are_code() {
        let css = for_extension("css");
        assert!(css.is_code());
        assert!(css.line.is_none());
        assert_eq!(css.block.map(|b| b.start), Some("/*"));
    }
}
