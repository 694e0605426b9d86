//! Strings with embedded numbers and colors
//!
//! `"translateX(10px) rotate(45deg)"` parses into a literal template with
//! two number slots. Two such strings mix when they hold the same number of
//! numbers and colors; the target's template is used for output.

use super::color::{mix_rgba, Rgba};
use super::{format_number, mix_number};
use regex::Regex;
use std::sync::OnceLock;

/// One animatable slot in a complex value
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Color(Rgba),
}

impl Token {
    fn is_color(&self) -> bool {
        matches!(self, Token::Color(_))
    }

    fn write(&self, out: &mut String) {
        match self {
            Token::Number(n) => out.push_str(&format_number(*n)),
            Token::Color(color) => out.push_str(&color.to_css()),
        }
    }
}

static COLOR_TOKEN: OnceLock<Regex> = OnceLock::new();
static NUMBER_TOKEN: OnceLock<Regex> = OnceLock::new();

fn color_token() -> &'static Regex {
    COLOR_TOKEN.get_or_init(|| {
        Regex::new(r"(?i)#[0-9a-f]{3,8}\b|(?:rgb|hsl)a?\([^)]*\)").expect("Invalid color token regex")
    })
}

fn number_token() -> &'static Regex {
    NUMBER_TOKEN.get_or_init(|| Regex::new(r"-?(?:\d+(?:\.\d+)?|\.\d+)").expect("Invalid number token regex"))
}

/// A parsed template: `parts.len() == tokens.len() + 1`
#[derive(Clone, Debug, PartialEq)]
pub struct ComplexValue {
    parts: Vec<String>,
    tokens: Vec<Token>,
}

impl ComplexValue {
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for found in color_token().find_iter(text) {
            let Some(color) = Rgba::parse(found.as_str()) else {
                continue;
            };
            split_numbers(&text[last..found.start()], &mut literal, &mut parts, &mut tokens);
            parts.push(std::mem::take(&mut literal));
            tokens.push(Token::Color(color));
            last = found.end();
        }
        split_numbers(&text[last..], &mut literal, &mut parts, &mut tokens);
        parts.push(literal);

        Self { parts, tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// No numbers or colors at all
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn numbers(&self) -> Vec<f64> {
        self.tokens
            .iter()
            .filter_map(|token| match token {
                Token::Number(n) => Some(*n),
                Token::Color(_) => None,
            })
            .collect()
    }

    pub fn color_count(&self) -> usize {
        self.tokens.iter().filter(|token| token.is_color()).count()
    }

    /// Fill the template with `tokens`, in slot order
    pub fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        for (index, part) in self.parts.iter().enumerate() {
            out.push_str(part);
            if let Some(token) = tokens.get(index) {
                token.write(&mut out);
            }
        }
        out
    }

    /// Fill the number slots with `numbers`, keeping colors as parsed
    pub fn render_numbers(&self, numbers: &[f64]) -> String {
        let mut numbers = numbers.iter();
        let tokens: Vec<Token> = self
            .tokens
            .iter()
            .map(|token| match token {
                Token::Number(original) => Token::Number(*numbers.next().unwrap_or(original)),
                Token::Color(_) => token.clone(),
            })
            .collect();
        self.render(&tokens)
    }

    /// The same template with every number set to zero
    pub fn zero(&self) -> String {
        let zeros = vec![0.0; self.tokens.len()];
        self.render_numbers(&zeros)
    }
}

fn split_numbers(segment: &str, literal: &mut String, parts: &mut Vec<String>, tokens: &mut Vec<Token>) {
    let mut last = 0;
    for found in number_token().find_iter(segment) {
        let Ok(number) = found.as_str().parse::<f64>() else {
            continue;
        };
        literal.push_str(&segment[last..found.start()]);
        parts.push(std::mem::take(literal));
        tokens.push(Token::Number(number));
        last = found.end();
    }
    literal.push_str(&segment[last..]);
}

/// Build a mixer between two parsed values.
///
/// Returns `None` when they hold different numbers of numbers or colors.
/// Slots are paired by kind and order, so `"#fff 0px"` mixes with
/// `"10px #000"`.
pub fn mix_complex(origin: ComplexValue, target: ComplexValue) -> Option<impl Fn(f64) -> String> {
    if origin.numbers().len() != target.numbers().len() || origin.color_count() != target.color_count() {
        return None;
    }

    let mut origin_numbers = origin.tokens.iter().filter(|token| !token.is_color());
    let mut origin_colors = origin.tokens.iter().filter(|token| token.is_color());

    let mut pairs = Vec::with_capacity(target.tokens.len());
    for token in &target.tokens {
        let from = if token.is_color() {
            origin_colors.next()?
        } else {
            origin_numbers.next()?
        };
        pairs.push((from.clone(), token.clone()));
    }

    Some(move |p: f64| {
        let tokens: Vec<Token> = pairs
            .iter()
            .map(|pair| match pair {
                (Token::Number(a), Token::Number(b)) => Token::Number(mix_number(*a, *b, p)),
                (Token::Color(a), Token::Color(b)) => Token::Color(mix_rgba(a, b, p)),
                (_, to) => to.clone(),
            })
            .collect();
        target.render(&tokens)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_template() {
        let value = ComplexValue::parse("translateX(10px) rotate(-45.5deg)");
        assert_eq!(value.numbers(), vec![10.0, -45.5]);
        assert_eq!(value.render_numbers(&[1.0, 2.0]), "translateX(1px) rotate(2deg)");
    }

    #[test]
    fn test_parse_colors_before_numbers() {
        let value = ComplexValue::parse("0px 0px 10px rgba(0, 0, 0, 0.5)");
        assert_eq!(value.numbers(), vec![0.0, 0.0, 10.0]);
        assert_eq!(value.color_count(), 1);
        assert_eq!(value.zero(), "0px 0px 0px rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn test_mix_shadow() {
        let origin = ComplexValue::parse("0px 0px #000");
        let target = ComplexValue::parse("10px 20px #fff");
        let mix = mix_complex(origin, target).unwrap();
        assert_eq!(mix(0.0), "0px 0px rgba(0, 0, 0, 1)");
        assert_eq!(mix(0.5), "5px 10px rgba(180, 180, 180, 1)");
    }

    #[test]
    fn test_mix_matches_order_by_kind() {
        let origin = ComplexValue::parse("#000 0px");
        let target = ComplexValue::parse("10px #fff");
        let mix = mix_complex(origin, target).unwrap();
        assert_eq!(mix(1.0), "10px rgba(255, 255, 255, 1)");
    }

    #[test]
    fn test_mismatched_counts() {
        let origin = ComplexValue::parse("translateX(0px)");
        let target = ComplexValue::parse("translateX(10px) scale(2)");
        assert!(mix_complex(origin, target).is_none());
    }
}
