use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

/// 已接入的 DEX 执行路径。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Protocol {
    Jupiter,
    Raydium,
    PumpFun,
    Moonshot,
    Meteora,
    Launchpad,
    Boop,
}

impl Protocol {
    pub const ALL: [Protocol; 7] = [
        Protocol::Jupiter,
        Protocol::Raydium,
        Protocol::PumpFun,
        Protocol::Moonshot,
        Protocol::Meteora,
        Protocol::Launchpad,
        Protocol::Boop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Jupiter => "jupiter",
            Protocol::Raydium => "raydium",
            Protocol::PumpFun => "pumpfun",
            Protocol::Moonshot => "moonshot",
            Protocol::Meteora => "meteora",
            Protocol::Launchpad => "launchpad",
            Protocol::Boop => "boop",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.as_str() == normalized)
            .ok_or_else(|| KindParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "buy",
            Direction::Sell => "sell",
        }
    }
}

impl FromStr for Direction {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            _ => Err(KindParseError(s.to_string())),
        }
    }
}

/// 操作类型：决定容量上限与适配器。
///
/// 字符串形式为 `buy@raydium`、`sell@jupiter`、`rotate@pumpfun`、`transfer`、
/// `burn`、`deploy`。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub enum OperationKind {
    Swap(Protocol, Direction),
    /// 卖方释放持仓、买方接手的成对操作。
    Rotate(Protocol),
    Transfer,
    Burn,
    Deploy,
}

impl OperationKind {
    pub fn buy(protocol: Protocol) -> Self {
        OperationKind::Swap(protocol, Direction::Buy)
    }

    pub fn sell(protocol: Protocol) -> Self {
        OperationKind::Swap(protocol, Direction::Sell)
    }

    /// 所有内置操作类型，按固定顺序。
    pub fn builtin() -> Vec<OperationKind> {
        let mut kinds = Vec::with_capacity(Protocol::ALL.len() * 3 + 3);
        for protocol in Protocol::ALL {
            kinds.push(OperationKind::buy(protocol));
            kinds.push(OperationKind::sell(protocol));
            kinds.push(OperationKind::Rotate(protocol));
        }
        kinds.extend([
            OperationKind::Transfer,
            OperationKind::Burn,
            OperationKind::Deploy,
        ]);
        kinds
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Swap(protocol, direction) => {
                write!(f, "{}@{}", direction.as_str(), protocol)
            }
            OperationKind::Rotate(protocol) => write!(f, "rotate@{protocol}"),
            OperationKind::Transfer => f.write_str("transfer"),
            OperationKind::Burn => f.write_str("burn"),
            OperationKind::Deploy => f.write_str("deploy"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = KindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.split_once('@') {
            Some((action, protocol)) => {
                let protocol =
                    Protocol::from_str(protocol).map_err(|_| KindParseError(s.to_string()))?;
                if action.trim().eq_ignore_ascii_case("rotate") {
                    return Ok(OperationKind::Rotate(protocol));
                }
                let direction =
                    Direction::from_str(action).map_err(|_| KindParseError(s.to_string()))?;
                Ok(OperationKind::Swap(protocol, direction))
            }
            None => match trimmed.to_ascii_lowercase().as_str() {
                "transfer" => Ok(OperationKind::Transfer),
                "burn" => Ok(OperationKind::Burn),
                "deploy" => Ok(OperationKind::Deploy),
                _ => Err(KindParseError(s.to_string())),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知的操作类型: {0}")]
pub struct KindParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_swap_and_plain_kinds() {
        assert_eq!(
            "buy@raydium".parse::<OperationKind>().unwrap(),
            OperationKind::buy(Protocol::Raydium)
        );
        assert_eq!(
            " Sell@Jupiter ".parse::<OperationKind>().unwrap(),
            OperationKind::sell(Protocol::Jupiter)
        );
        assert_eq!(
            "rotate@pumpfun".parse::<OperationKind>().unwrap(),
            OperationKind::Rotate(Protocol::PumpFun)
        );
        assert_eq!(
            "deploy".parse::<OperationKind>().unwrap(),
            OperationKind::Deploy
        );
    }

    #[test]
    fn rejects_unknown_protocol_or_action() {
        assert!("buy@uniswap".parse::<OperationKind>().is_err());
        assert!("hold@raydium".parse::<OperationKind>().is_err());
        assert!("mint".parse::<OperationKind>().is_err());
    }

    #[test]
    fn display_matches_parse_for_builtin_kinds() {
        for kind in OperationKind::builtin() {
            let rendered = kind.to_string();
            assert_eq!(rendered.parse::<OperationKind>().unwrap(), kind);
        }
        assert_eq!(OperationKind::builtin().len(), 24);
    }
}
