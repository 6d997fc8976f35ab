//! Math rendering for block and inline formulas.
//!
//! The tree stores LaTeX verbatim. At display time the source is normalized
//! (incidental whitespace from upstream formatting is removed) and handed to
//! a [`MathRenderer`]. The default renderer validates the source and emits it
//! in `\[..\]` / `\(..\)` delimiters for a client-side typesetter.
//!
//! Rendering never fails past [`render_math`]: a rejected formula is shown as
//! its raw source with an error class, and a warning is logged.

use crate::error::MathError;
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([_^])\s+\{").unwrap());
static COMMAND_SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(tag|left|right|sum|int|prod|frac|sqrt|lim|log|ln|sin|cos|tan)\s+([{(\[\]])")
        .unwrap()
});
static BRACKET_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([)\[\]])\s+\{").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Commands that can reach outside the formula (links, images, raw HTML
/// attributes) and are only accepted when `trust` is on.
const UNTRUSTED_COMMANDS: &[&str] = &[
    "href",
    "url",
    "includegraphics",
    "htmlClass",
    "htmlId",
    "htmlStyle",
    "htmlData",
];

/// Removes whitespace that upstream formatting tends to introduce, e.g.
/// `y _ {j}` → `y_{j}` and `\frac {a}` → `\frac{a}`.
pub fn normalize_latex_syntax(latex: &str) -> String {
    let latex = SCRIPT_SPACE.replace_all(latex, "$1{");
    let latex = COMMAND_SPACE.replace_all(&latex, r"\$1$2");
    let latex = BRACKET_SPACE.replace_all(&latex, "$1{");
    let latex = WHITESPACE_RUN.replace_all(&latex, " ");
    latex.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathOptions {
    /// Report invalid LaTeX as an error instead of showing it in `error_color`.
    pub throw_on_error: bool,
    pub error_color: String,
    /// Reject non-ASCII characters in math mode.
    pub strict: bool,
    /// Allow commands that link or embed external content.
    pub trust: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            throw_on_error: false,
            error_color: "#cc0000".to_string(),
            strict: false,
            trust: true,
        }
    }
}

/// A formula ready to be placed in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathMarkup {
    pub text: String,
    /// Colour and message when the source was invalid but errors are shown
    /// inline rather than raised.
    pub inline_error: Option<(String, String)>,
}

pub trait MathRenderer: Send + Sync {
    fn render(&self, latex: &str, display: bool) -> Result<MathMarkup, MathError>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultMathRenderer {
    options: MathOptions,
}

impl DefaultMathRenderer {
    pub fn new(options: MathOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MathOptions {
        &self.options
    }
}

impl MathRenderer for DefaultMathRenderer {
    fn render(&self, latex: &str, display: bool) -> Result<MathMarkup, MathError> {
        match validate_latex(latex, display, &self.options) {
            Ok(()) => {
                let text = if display {
                    format!("\\[{latex}\\]")
                } else {
                    format!("\\({latex}\\)")
                };
                Ok(MathMarkup {
                    text,
                    inline_error: None,
                })
            }
            Err(error) if !self.options.throw_on_error => Ok(MathMarkup {
                text: latex.to_string(),
                inline_error: Some((self.options.error_color.clone(), error.to_string())),
            }),
            Err(error) => Err(error),
        }
    }
}

/// What a document shows for one formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathOutput {
    pub text: String,
    pub class: &'static str,
    pub style: Option<String>,
    pub title: Option<String>,
}

/// Normalizes and renders a formula, falling back to the raw source with
/// `block-math-error` / `inline-math-error` when the renderer fails.
pub fn render_math(renderer: &dyn MathRenderer, latex: &str, display: bool) -> MathOutput {
    let normalized = normalize_latex_syntax(latex);
    match renderer.render(&normalized, display) {
        Ok(markup) => {
            let (style, title) = match markup.inline_error {
                Some((color, message)) => (Some(format!("color: {color}")), Some(message)),
                None => (None, None),
            };
            MathOutput {
                text: markup.text,
                class: "math-render",
                style,
                title,
            }
        }
        Err(error) => {
            tracing::warn!(latex, %error, "LaTeX render error");
            MathOutput {
                text: latex.to_string(),
                class: if display {
                    "block-math-error"
                } else {
                    "inline-math-error"
                },
                style: None,
                title: Some(error.to_string()),
            }
        }
    }
}

/// Structural checks a typesetter would fail on.
pub fn validate_latex(latex: &str, display: bool, options: &MathOptions) -> Result<(), MathError> {
    let chars: Vec<char> = latex.chars().collect();
    let mut braces: i32 = 0;
    let mut delimiters: i32 = 0;
    let mut environments: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let Some(next) = chars.get(i + 1) else {
                    return Err(MathError::TrailingBackslash);
                };
                if !next.is_ascii_alphabetic() {
                    // control symbol such as \\ or \{
                    i += 2;
                    continue;
                }
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_alphabetic() {
                    end += 1;
                }
                let word: String = chars[start..end].iter().collect();
                match word.as_str() {
                    "left" => delimiters += 1,
                    "right" => {
                        delimiters -= 1;
                        if delimiters < 0 {
                            return Err(MathError::UnmatchedDelimiter);
                        }
                    }
                    "begin" => environments.push(environment_name(&chars[end..])?),
                    "end" => {
                        let found = environment_name(&chars[end..])?;
                        match environments.pop() {
                            Some(expected) if expected == found => {}
                            Some(expected) => {
                                return Err(MathError::MismatchedEnvironment { expected, found })
                            }
                            None => return Err(MathError::UnexpectedEnd(found)),
                        }
                    }
                    "tag" if !display => return Err(MathError::TagOutsideDisplay),
                    command if !options.trust && UNTRUSTED_COMMANDS.contains(&command) => {
                        return Err(MathError::Untrusted(word));
                    }
                    _ => {}
                }
                i = end;
                continue;
            }
            '{' => braces += 1,
            '}' => {
                braces -= 1;
                if braces < 0 {
                    return Err(MathError::UnbalancedBraces(latex.to_string()));
                }
            }
            c if options.strict && !c.is_ascii() => return Err(MathError::NonAscii(c)),
            _ => {}
        }
        i += 1;
    }

    if braces != 0 {
        return Err(MathError::UnbalancedBraces(latex.to_string()));
    }
    if delimiters != 0 {
        return Err(MathError::UnmatchedDelimiter);
    }
    if let Some(open) = environments.pop() {
        return Err(MathError::UnclosedEnvironment(open));
    }
    Ok(())
}

fn environment_name(rest: &[char]) -> Result<String, MathError> {
    let mut chars = rest.iter().skip_while(|c| c.is_whitespace());
    if chars.next() != Some(&'{') {
        return Err(MathError::MissingEnvironmentName);
    }
    let name: String = chars.take_while(|c| **c != '}').collect();
    if name.trim().is_empty() {
        return Err(MathError::MissingEnvironmentName);
    }
    Ok(name.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strict() -> MathOptions {
        MathOptions {
            throw_on_error: true,
            ..MathOptions::default()
        }
    }

    #[test]
    fn normalizes_script_operator_spacing() {
        assert_eq!(normalize_latex_syntax("y _ {j} + x^ {2}"), "y_{j} + x^{2}");
    }

    #[test]
    fn normalizes_command_spacing() {
        assert_eq!(
            normalize_latex_syntax(r"\frac {a}{b} \left ( x \right ) \tag {1}"),
            r"\frac{a}{b} \left( x \right) \tag{1}"
        );
        assert_eq!(normalize_latex_syntax(r"\sqrt [3] {x}"), r"\sqrt[3]{x}");
    }

    #[test]
    fn collapses_and_trims_whitespace() {
        assert_eq!(normalize_latex_syntax("  a  +\n\n b "), "a + b");
    }

    #[test]
    fn valid_formulas_are_delimited() {
        let renderer = DefaultMathRenderer::new(strict());
        assert_eq!(renderer.render("x^2", false).unwrap().text, r"\(x^2\)");
        assert_eq!(
            renderer.render(r"a \tag{1}", true).unwrap().text,
            r"\[a \tag{1}\]"
        );
    }

    #[test]
    fn structural_errors_are_detected() {
        let opts = strict();
        assert!(matches!(
            validate_latex("{x", true, &opts),
            Err(MathError::UnbalancedBraces(_))
        ));
        assert_eq!(
            validate_latex(r"\left( x", true, &opts),
            Err(MathError::UnmatchedDelimiter)
        );
        assert_eq!(
            validate_latex(r"\begin{a} x \end{b}", true, &opts),
            Err(MathError::MismatchedEnvironment {
                expected: "a".to_string(),
                found: "b".to_string()
            })
        );
        assert_eq!(
            validate_latex(r"\begin{matrix} 1", true, &opts),
            Err(MathError::UnclosedEnvironment("matrix".to_string()))
        );
        assert_eq!(
            validate_latex(r"x \", true, &opts),
            Err(MathError::TrailingBackslash)
        );
        assert_eq!(
            validate_latex(r"x \tag{1}", false, &opts),
            Err(MathError::TagOutsideDisplay)
        );
        assert_eq!(validate_latex(r"a \\ b \{ c", true, &opts), Ok(()));
    }

    #[test]
    fn strict_and_trust_options() {
        let opts = MathOptions {
            strict: true,
            trust: false,
            ..strict()
        };
        assert_eq!(validate_latex("α", false, &opts), Err(MathError::NonAscii('α')));
        assert_eq!(
            validate_latex(r"\href{u}{x}", false, &opts),
            Err(MathError::Untrusted("href".to_string()))
        );
        assert_eq!(validate_latex("α", false, &MathOptions::default()), Ok(()));
    }

    #[test]
    fn failures_fall_back_to_source_with_error_class() {
        let renderer = DefaultMathRenderer::new(strict());
        let out = render_math(&renderer, "{x", true);
        assert_eq!(out.text, "{x");
        assert_eq!(out.class, "block-math-error");
        let out = render_math(&renderer, r"\tag{1}", false);
        assert_eq!(out.class, "inline-math-error");
    }

    #[test]
    fn inline_errors_use_error_color() {
        let renderer = DefaultMathRenderer::default();
        let out = render_math(&renderer, "{x", false);
        assert_eq!(out.class, "math-render");
        assert_eq!(out.style.as_deref(), Some("color: #cc0000"));
        assert_eq!(out.text, "{x");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(latex in r"[a-z_^{}()\[\]\\ \t\n]{0,40}") {
            let once = normalize_latex_syntax(&latex);
            prop_assert_eq!(normalize_latex_syntax(&once), once.clone());
        }

        #[test]
        fn normalization_leaves_no_double_whitespace(latex in r"[a-z_^{} \t\n]{0,40}") {
            let out = normalize_latex_syntax(&latex);
            let chars: Vec<char> = out.chars().collect();
            prop_assert!(chars.windows(2).all(|w| !(w[0].is_whitespace() && w[1].is_whitespace())));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
