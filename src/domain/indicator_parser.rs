//! Parser for indicator lists such as `RSI(14), MACD(12,26,9), FVG`.
//!
//! Names are case-insensitive. Errors carry the character offset of the
//! offending token.

use crate::domain::indicator::IndicatorType;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.pos,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    fn consume_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_word(&mut self) -> String {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_uppercase()
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    /// A strictly positive integer parameter.
    fn parse_period(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let num_str = &self.input[start..self.pos];
        match num_str.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ParseError {
                message: format!("expected positive integer, found '{}'", num_str),
                position: start,
            }),
        }
    }

    fn parse_args(&mut self, count: usize) -> Result<Vec<usize>, ParseError> {
        self.expect_char('(')?;
        let mut args = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                self.expect_char(',')?;
            }
            args.push(self.parse_period()?);
        }
        self.expect_char(')')?;
        Ok(args)
    }

    fn parse_indicator(&mut self) -> Result<IndicatorType, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.parse_word();
        let indicator = match name.as_str() {
            "SMA" => IndicatorType::Sma(self.parse_args(1)?[0]),
            "EMA" => IndicatorType::Ema(self.parse_args(1)?[0]),
            "RSI" => IndicatorType::Rsi(self.parse_args(1)?[0]),
            "ATR" => IndicatorType::Atr(self.parse_args(1)?[0]),
            "VOLUME_SMA" => IndicatorType::VolumeSma(self.parse_args(1)?[0]),
            "OBV" => IndicatorType::Obv,
            "FVG" => IndicatorType::FairValueGap,
            "BREAKOUT" => IndicatorType::Breakout {
                window: self.parse_args(1)?[0],
            },
            "TREND" => IndicatorType::Trend {
                window: self.parse_args(1)?[0],
            },
            "MACD" => {
                let args = self.parse_args(3)?;
                IndicatorType::Macd {
                    fast: args[0],
                    slow: args[1],
                    signal: args[2],
                }
            }
            "BOLLINGER" => {
                self.expect_char('(')?;
                let period = self.parse_period()?;
                self.expect_char(',')?;
                let mult = self.parse_number()?;
                self.expect_char(')')?;
                if mult <= 0.0 {
                    return Err(self.error("bollinger multiplier must be positive"));
                }
                IndicatorType::Bollinger {
                    period,
                    stddev_mult_x100: (mult * 100.0).round() as u32,
                }
            }
            "" => {
                return Err(ParseError {
                    message: "expected indicator name".to_string(),
                    position: start,
                });
            }
            other => {
                return Err(ParseError {
                    message: format!("unknown indicator '{}'", other),
                    position: start,
                });
            }
        };
        Ok(indicator)
    }
}

/// Parses a comma-separated indicator list. An empty or blank input yields
/// an empty list.
pub fn parse_indicators(input: &str) -> Result<Vec<IndicatorType>, ParseError> {
    let mut parser = Parser::new(input);
    let mut indicators = Vec::new();

    parser.skip_whitespace();
    if parser.peek().is_none() {
        return Ok(indicators);
    }

    loop {
        indicators.push(parser.parse_indicator()?);
        if !parser.consume_char(',') {
            break;
        }
    }

    parser.skip_whitespace();
    if let Some(ch) = parser.peek() {
        return Err(parser.error(format!("unexpected '{}' after indicator", ch)));
    }
    Ok(indicators)
}
