//! Cheat text recognition and the indexed registry the host fills in.
//!
//! Hosts hand over one free-form string per cheat. Lines are split on
//! newlines or `;`, an optional `gecko:` / `ar:` / `actionreplay:` prefix
//! pins the format, and otherwise the format is inferred from the lines.

use crate::error::CheatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheatFormat {
    ActionReplay,
    Gecko,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheatLine {
    /// An `AAAAAAAA VVVVVVVV` pair.
    Code { address: u32, value: u32 },
    /// An encrypted Action Replay line, decrypted by the core.
    Encrypted(String),
    /// A Gecko line the core may understand even though it is not a plain pair.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cheat {
    pub name: String,
    pub enabled: bool,
    pub format: CheatFormat,
    pub lines: Vec<CheatLine>,
}

impl Cheat {
    pub fn parse(index: usize, enabled: bool, code: &str) -> Result<Self, CheatError> {
        let (hint, lines) = split_lines(code);
        if lines.is_empty() {
            return Err(CheatError::Empty);
        }
        let (format, lines) = match hint {
            Some(CheatFormat::ActionReplay) => (CheatFormat::ActionReplay, parse_ar(&lines)?),
            Some(CheatFormat::Gecko) => (CheatFormat::Gecko, parse_gecko_lenient(&lines)),
            None => detect(&lines)?,
        };
        Ok(Self {
            name: format!("Libretro Cheat {}", index + 1),
            enabled,
            format,
            lines,
        })
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

fn split_lines(code: &str) -> (Option<CheatFormat>, Vec<&str>) {
    let mut lines: Vec<&str> = code
        .split(['\n', ';'])
        .map(|line| line.trim_matches(|c: char| c == '\r' || c.is_whitespace()))
        .filter(|line| !line.is_empty())
        .collect();

    let mut hint = None;
    if let Some(first) = lines.first().copied() {
        let stripped = [
            ("gecko:", CheatFormat::Gecko),
            ("actionreplay:", CheatFormat::ActionReplay),
            ("ar:", CheatFormat::ActionReplay),
        ]
        .into_iter()
        .find_map(|(prefix, format)| strip_prefix_ci(first, prefix).map(|rest| (rest, format)));
        if let Some((rest, format)) = stripped {
            hint = Some(format);
            let rest = rest.trim();
            if rest.is_empty() {
                lines.remove(0);
            } else {
                lines[0] = rest;
            }
        }
    }
    (hint, lines)
}

fn parse_hex_word(token: &str) -> Option<u32> {
    if token.is_empty() || token.len() > 8 || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(token, 16).ok()
}

fn is_encrypted_ar(line: &str) -> bool {
    let groups: Vec<&str> = line.split('-').collect();
    groups.len() == 3
        && groups
            .iter()
            .zip([4, 4, 5])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn parse_plain_ar(line: &str) -> Option<CheatLine> {
    let (address, value) = line.split_once(' ')?;
    if address.len() != 8 || value.len() != 8 {
        return None;
    }
    Some(CheatLine::Code {
        address: parse_hex_word(address)?,
        value: parse_hex_word(value)?,
    })
}

fn parse_ar_line(line: &str) -> Option<CheatLine> {
    if is_encrypted_ar(line) {
        return Some(CheatLine::Encrypted(line.to_ascii_uppercase()));
    }
    parse_plain_ar(line)
}

fn parse_gecko_line(line: &str) -> Option<CheatLine> {
    let mut tokens = line.split_whitespace();
    let address = parse_hex_word(tokens.next()?)?;
    let value = parse_hex_word(tokens.next()?)?;
    tokens.next().is_none().then_some(CheatLine::Code { address, value })
}

fn parse_ar(lines: &[&str]) -> Result<Vec<CheatLine>, CheatError> {
    lines
        .iter()
        .map(|line| parse_ar_line(line).ok_or_else(|| CheatError::InvalidLine((*line).to_owned())))
        .collect()
}

fn parse_gecko_lenient(lines: &[&str]) -> Vec<CheatLine> {
    lines
        .iter()
        .map(|line| parse_gecko_line(line).unwrap_or_else(|| CheatLine::Raw((*line).to_owned())))
        .collect()
}

fn detect(lines: &[&str]) -> Result<(CheatFormat, Vec<CheatLine>), CheatError> {
    if lines.iter().any(|line| is_encrypted_ar(line)) {
        return parse_ar(lines).map(|parsed| (CheatFormat::ActionReplay, parsed));
    }
    if let Some(parsed) = lines.iter().map(|line| parse_plain_ar(line)).collect::<Option<Vec<_>>>() {
        return Ok((CheatFormat::ActionReplay, parsed));
    }
    let gecko: Vec<Option<CheatLine>> = lines.iter().map(|line| parse_gecko_line(line)).collect();
    if gecko.iter().all(Option::is_some) {
        return Ok((CheatFormat::Gecko, gecko.into_iter().flatten().collect()));
    }
    match gecko.iter().position(Option::is_none) {
        Some(bad) if gecko.iter().any(Option::is_some) && parse_ar_line(lines[bad]).is_some() => {
            Err(CheatError::MixedFormats)
        }
        Some(bad) => Err(CheatError::InvalidLine(lines[bad].to_owned())),
        None => Err(CheatError::Empty),
    }
}

/// Cheats indexed the way the host numbers them. Invalid entries occupy
/// their slot but are never handed to the core.
#[derive(Debug, Default)]
pub struct CheatRegistry {
    slots: Vec<Option<Cheat>>,
}

impl CheatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }

    pub fn set(&mut self, index: usize, enabled: bool, code: &str) -> Result<(), CheatError> {
        if self.slots.len() <= index {
            self.slots.resize(index + 1, None);
        }
        match Cheat::parse(index, enabled, code) {
            Ok(cheat) => {
                tracing::debug!(index, format = ?cheat.format, lines = cheat.lines.len(), "cheat set");
                self.slots[index] = Some(cheat);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "ignoring invalid cheat");
                self.slots[index] = None;
                Err(err)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn valid(&self) -> Vec<Cheat> {
        self.slots.iter().flatten().cloned().collect()
    }

    pub fn any_enabled(&self) -> bool {
        self.slots.iter().flatten().any(|cheat| cheat.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pairs_are_action_replay() {
        let cheat = Cheat::parse(0, true, "04001234 00000063\r\n04005678 0000FFFF").unwrap();
        assert_eq!(cheat.format, CheatFormat::ActionReplay);
        assert_eq!(cheat.name, "Libretro Cheat 1");
        assert_eq!(
            cheat.lines,
            [
                CheatLine::Code { address: 0x04001234, value: 0x63 },
                CheatLine::Code { address: 0x04005678, value: 0xFFFF },
            ]
        );
    }

    #[test]
    fn encrypted_lines_are_action_replay() {
        let cheat = Cheat::parse(2, false, "abcd-efgh-12345;04001234 00000001").unwrap();
        assert_eq!(cheat.format, CheatFormat::ActionReplay);
        assert_eq!(cheat.lines[0], CheatLine::Encrypted("ABCD-EFGH-12345".into()));
    }

    #[test]
    fn loose_pairs_are_gecko() {
        let cheat = Cheat::parse(1, true, "C2 1\n4200\t10").unwrap();
        assert_eq!(cheat.format, CheatFormat::Gecko);
        assert_eq!(cheat.lines[1], CheatLine::Code { address: 0x4200, value: 0x10 });
    }

    #[test]
    fn prefix_pins_format() {
        let cheat = Cheat::parse(0, true, "GECKO:\n04001234 00000001;not hex").unwrap();
        assert_eq!(cheat.format, CheatFormat::Gecko);
        assert_eq!(cheat.lines[1], CheatLine::Raw("not hex".into()));

        let cheat = Cheat::parse(0, true, "ar: 04001234 00000001").unwrap();
        assert_eq!(cheat.format, CheatFormat::ActionReplay);
        assert_eq!(cheat.lines.len(), 1);

        assert_eq!(
            Cheat::parse(0, true, "ActionReplay:4200 10"),
            Err(CheatError::InvalidLine("4200 10".into()))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Cheat::parse(0, true, " ;\r\n "), Err(CheatError::Empty));
        assert_eq!(Cheat::parse(0, true, "gecko:"), Err(CheatError::Empty));
        assert_eq!(
            Cheat::parse(0, true, "zzz"),
            Err(CheatError::InvalidLine("zzz".into()))
        );
    }

    #[test]
    fn registry_grows_and_skips_invalid() {
        let mut registry = CheatRegistry::new();
        registry.set(3, false, "04001234 00000001").unwrap();
        assert_eq!(registry.len(), 4);
        assert!(registry.set(1, true, "nonsense").is_err());
        assert_eq!(registry.valid().len(), 1);
        assert!(!registry.any_enabled());

        registry.set(0, true, "C2 1").unwrap();
        assert!(registry.any_enabled());

        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.valid().is_empty());
    }
}
