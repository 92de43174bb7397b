//! Mapping from code fence info strings to Feishu code language ids.

/// Language id for plain text, also the fallback for unknown names.
pub const PLAIN_TEXT: u32 = 1;

/// Resolve a fence info string (`rust`, `py`, `c++`, ...) to the docx code
/// language enum. Only the first word is considered; matching ignores case.
pub fn code_language_id(info: &str) -> u32 {
    let name = info
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match name.as_str() {
        "" | "text" | "plaintext" | "plain" | "txt" => PLAIN_TEXT,
        "abap" => 2,
        "ada" => 3,
        "apache" => 4,
        "apex" => 5,
        "asm" | "assembly" => 6,
        "bash" | "sh" | "zsh" => 7,
        "csharp" | "c#" | "cs" => 8,
        "cpp" | "c++" | "cc" | "cxx" | "hpp" => 9,
        "c" | "h" => 10,
        "cobol" => 11,
        "css" => 12,
        "coffeescript" | "coffee" => 13,
        "d" => 14,
        "dart" => 15,
        "delphi" | "pascal" => 16,
        "django" => 17,
        "dockerfile" | "docker" => 18,
        "erlang" | "erl" => 19,
        "fortran" => 20,
        "foxpro" => 21,
        "go" | "golang" => 22,
        "groovy" => 23,
        "html" | "htm" => 24,
        "htmlbars" | "handlebars" => 25,
        "http" => 26,
        "haskell" | "hs" => 27,
        "json" | "jsonc" => 28,
        "java" => 29,
        "javascript" | "js" | "jsx" | "mjs" => 30,
        "julia" | "jl" => 31,
        "kotlin" | "kt" => 32,
        "latex" | "tex" => 33,
        "lisp" | "elisp" => 34,
        "logo" => 35,
        "lua" => 36,
        "matlab" => 37,
        "makefile" | "make" => 38,
        "markdown" | "md" => 39,
        "nginx" => 40,
        "objective-c" | "objc" | "objectivec" => 41,
        "openedgeabl" => 42,
        "php" => 43,
        "perl" | "pl" => 44,
        "postscript" | "ps" => 45,
        "powershell" | "ps1" | "pwsh" => 46,
        "prolog" => 47,
        "protobuf" | "proto" => 48,
        "python" | "py" | "python3" => 49,
        "r" => 50,
        "rpg" => 51,
        "ruby" | "rb" => 52,
        "rust" | "rs" => 53,
        "sas" => 54,
        "scss" | "sass" => 55,
        "sql" => 56,
        "scala" => 57,
        "scheme" => 58,
        "scratch" => 59,
        "shell" | "console" | "shell-session" => 60,
        "swift" => 61,
        "thrift" => 62,
        "typescript" | "ts" | "tsx" => 63,
        "vbscript" | "vbs" => 64,
        "vb" | "visualbasic" => 65,
        "xml" | "svg" => 66,
        "yaml" | "yml" => 67,
        "cmake" => 68,
        "diff" | "patch" => 69,
        "gherkin" | "cucumber" => 70,
        "graphql" | "gql" => 71,
        "glsl" => 72,
        "properties" | "ini" => 73,
        "solidity" | "sol" => 74,
        "toml" => 75,
        _ => PLAIN_TEXT,
    }
}
