//! Recursive-descent parser for the command grammar.
//!
//! ```text
//! root      := (target SP operation) / operation
//! target    := ("docker" / "netns" / "pid") SP id
//! operation := routeop / addrop
//! routeop   := "route" SP ("add" / "del") SP network (SP option)*
//! addrop    := "address" SP ("add" / "del") SP network (SP option)+
//! network   := addrstr "/" length / "default"
//! option    := "via" SP value / "dev" SP value
//! SP        := (' ' / '\t')*
//! ```
//!
//! Alternatives are ordered: each one runs from a saved cursor and the
//! cursor is rewound when it does not match. Every mismatch is recorded, and
//! when nothing matches the rightmost one becomes the diagnostic. A few
//! rules cut instead: once they are reached the input is known to be wrong
//! no matter which alternative is tried next.

use super::diagnostic::{GENERIC_MESSAGE, ParseError, ParseErrorKind};
use super::{Command, Network, Operation, Target};

const INVALID_NAMESPACE: &str = "Invalid namespace";
const INVALID_NETWORK: &str = "Invalid network";
const INVALID_ADDRESS: &str = "Invalid address";
const INVALID_OPTION: &str = "Invalid option";
const INVALID_PID: &str = "Invalid PID";
const INVALID_OPTION_FOR_ADDRESS: &str = "Invalid option for address";

pub(super) fn parse(input: &str) -> Result<Command, ParseError> {
    let mut parser = Parser::new(input);
    let failure = match parser.root() {
        Ok(command) => return Ok(command),
        Err(Halt::Cut(failure)) => failure,
        Err(Halt::Backtrack) => {
            let mut failure = parser.furthest.unwrap_or(Failure {
                offset: 0,
                kind: ParseErrorKind::Syntax,
                message: GENERIC_MESSAGE,
            });
            // Nothing matched past the leading blanks: point at the whole input.
            let lead = input.len() - input.trim_start_matches([' ', '\t']).len();
            if failure.offset <= lead {
                failure.offset = 0;
            }
            failure
        }
    };
    Err(ParseError::new(
        input,
        failure.offset,
        failure.kind,
        failure.message,
    ))
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    offset: usize,
    kind: ParseErrorKind,
    message: &'static str,
}

#[derive(Debug)]
enum Halt {
    /// This alternative does not match; try the next one.
    Backtrack,
    /// The input is invalid; stop parsing.
    Cut(Failure),
}

type Step<T> = Result<T, Halt>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    Via,
    Dev,
}

#[derive(Debug)]
struct Opt<'a> {
    kind: OptionKind,
    value: &'a str,
    offset: usize,
}

/// An operation without its target.
struct Body<'a> {
    operation: Operation,
    network: Network,
    via: Option<&'a str>,
    dev: Option<&'a str>,
}

impl<'a> Body<'a> {
    fn new(operation: Operation, network: Network) -> Self {
        Self {
            operation,
            network,
            via: None,
            dev: None,
        }
    }

    // Repeated options: the last one wins.
    fn set(&mut self, opt: Opt<'a>) {
        match opt.kind {
            OptionKind::Via => self.via = Some(opt.value),
            OptionKind::Dev => self.dev = Some(opt.value),
        }
    }

    fn into_command(self, target: Target) -> Command {
        Command {
            operation: self.operation,
            target,
            network: self.network,
            via: self.via.map(str::to_owned),
            dev: self.dev.map(str::to_owned),
        }
    }
}

fn is_addr_char(b: u8) -> bool {
    b.is_ascii_hexdigit() || b == b':' || b == b'.'
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    furthest: Option<Failure>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            furthest: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Record a mismatch at `offset` and backtrack.
    fn fail<T>(&mut self, offset: usize, message: &'static str) -> Step<T> {
        if self.furthest.is_none_or(|f| offset > f.offset) {
            self.furthest = Some(Failure {
                offset,
                kind: ParseErrorKind::Syntax,
                message,
            });
        }
        Err(Halt::Backtrack)
    }

    fn cut<T>(&self, offset: usize, kind: ParseErrorKind, message: &'static str) -> Step<T> {
        Err(Halt::Cut(Failure {
            offset,
            kind,
            message,
        }))
    }

    /// Run one alternative, rewinding the cursor if it does not match.
    fn attempt<T>(&mut self, rule: impl FnOnce(&mut Self) -> Step<T>) -> Step<Option<T>> {
        let start = self.pos;
        match rule(self) {
            Ok(value) => Ok(Some(value)),
            Err(Halt::Backtrack) => {
                self.pos = start;
                Ok(None)
            }
            Err(cut) => Err(cut),
        }
    }

    fn spaces(&mut self) {
        while matches!(self.input.as_bytes().get(self.pos), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    fn run(&mut self, accept: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && accept(bytes[self.pos]) {
            self.pos += 1;
        }
        &self.input[start..self.pos]
    }

    /// A run of non-whitespace characters.
    fn token(&mut self) -> &'a str {
        self.run(|b| !b.is_ascii_whitespace())
    }

    fn keyword(&mut self, word: &'static str) -> Step<()> {
        if self.rest().starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            self.fail(self.pos, GENERIC_MESSAGE)
        }
    }

    fn root(&mut self) -> Step<Command> {
        self.spaces();

        let targeted = self.attempt(|p| {
            let target = p.target()?;
            p.spaces();
            let body = p.operation()?;
            p.end()?;
            Ok(body.into_command(target))
        })?;
        if let Some(command) = targeted {
            return Ok(command);
        }

        let body = self.operation()?;
        self.end()?;
        Ok(body.into_command(Target::Current))
    }

    fn target(&mut self) -> Step<Target> {
        let start = self.pos;
        let Some(word) = ["docker", "netns", "pid"]
            .into_iter()
            .find(|w| self.rest().starts_with(w))
        else {
            return self.fail(start, GENERIC_MESSAGE);
        };
        self.pos += word.len();
        self.spaces();

        let at = self.pos;
        let id = self.token();
        if id.is_empty() {
            return self.fail(at, INVALID_NAMESPACE);
        }

        match word {
            "docker" => Ok(Target::Docker(id.to_string())),
            "netns" => Ok(Target::NetNs(id.to_string())),
            _ => match id.parse::<u32>() {
                Ok(pid) if id.bytes().all(|b| b.is_ascii_digit()) => Ok(Target::Pid(pid)),
                _ => self.cut(at, ParseErrorKind::InvalidPid, INVALID_PID),
            },
        }
    }

    fn operation(&mut self) -> Step<Body<'a>> {
        if let Some(body) = self.attempt(Self::route_op)? {
            return Ok(body);
        }
        self.address_op()
    }

    fn route_op(&mut self) -> Step<Body<'a>> {
        self.keyword("route")?;
        self.spaces();
        let operation = if self.verb()? {
            Operation::RouteAdd
        } else {
            Operation::RouteDel
        };
        self.spaces();
        let network = self.network(INVALID_NETWORK)?;

        let mut body = Body::new(operation, network);
        while let Some(opt) = self.attempt(Self::spaced_option)? {
            body.set(opt);
        }
        Ok(body)
    }

    fn address_op(&mut self) -> Step<Body<'a>> {
        self.keyword("address")?;
        self.spaces();
        let operation = if self.verb()? {
            Operation::AddrAdd
        } else {
            Operation::AddrDel
        };
        self.spaces();
        let network = self.network(INVALID_ADDRESS)?;

        let mut body = Body::new(operation, network);
        let mut count = 0;
        while let Some(opt) = self.attempt(Self::spaced_option)? {
            if opt.kind == OptionKind::Via {
                return self.cut(
                    opt.offset,
                    ParseErrorKind::UnsupportedCombination,
                    INVALID_OPTION_FOR_ADDRESS,
                );
            }
            body.set(opt);
            count += 1;
        }
        if count == 0 {
            // The failed option attempt already recorded where it stopped.
            return Err(Halt::Backtrack);
        }
        Ok(body)
    }

    /// `true` for add, `false` for del.
    fn verb(&mut self) -> Step<bool> {
        if self.rest().starts_with("add") {
            self.pos += 3;
            Ok(true)
        } else if self.rest().starts_with("del") {
            self.pos += 3;
            Ok(false)
        } else {
            self.fail(self.pos, GENERIC_MESSAGE)
        }
    }

    fn network(&mut self, message: &'static str) -> Step<Network> {
        if let Some(network) = self.attempt(|p| p.cidr(message))? {
            return Ok(network);
        }
        if self.rest().starts_with("default") {
            self.pos += "default".len();
            return Ok(Network::Default);
        }
        self.fail(self.pos, message)
    }

    fn cidr(&mut self, message: &'static str) -> Step<Network> {
        let address = self.run(is_addr_char);
        if address.is_empty() || !self.rest().starts_with('/') {
            return self.fail(self.pos, message);
        }
        self.pos += 1;
        let length = self.run(|b| b.is_ascii_digit());
        if length.is_empty() {
            return self.fail(self.pos, message);
        }
        Ok(Network::cidr(address, length))
    }

    fn spaced_option(&mut self) -> Step<Opt<'a>> {
        self.spaces();
        self.option()
    }

    fn option(&mut self) -> Step<Opt<'a>> {
        let offset = self.pos;
        let kind = if self.rest().starts_with("via") {
            OptionKind::Via
        } else if self.rest().starts_with("dev") {
            OptionKind::Dev
        } else {
            return self.fail(offset, INVALID_OPTION);
        };
        self.pos += 3;
        self.spaces();

        let at = self.pos;
        let value = self.token();
        if value.is_empty() {
            return self.fail(at, INVALID_OPTION);
        }
        Ok(Opt {
            kind,
            value,
            offset,
        })
    }

    /// Only whitespace may follow a complete command.
    fn end(&mut self) -> Step<()> {
        let rest = self.rest();
        let trailing = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_whitespace()).len();
        if self.pos + trailing == self.input.len() {
            self.pos = self.input.len();
            Ok(())
        } else {
            self.fail(self.pos + trailing, GENERIC_MESSAGE)
        }
    }
}
