/// Assets offered by `/add_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Asset {
    #[name = "BTC"]
    Btc,
    #[name = "ETH"]
    Eth,
    #[name = "XRP"]
    Xrp,
    #[name = "ADA"]
    Ada,
    #[name = "SOL"]
    Sol,
    #[name = "DOGE"]
    Doge,
    #[name = "AAVE"]
    Aave,
}

impl Asset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
            Asset::Xrp => "XRP",
            Asset::Ada => "ADA",
            Asset::Sol => "SOL",
            Asset::Doge => "DOGE",
            Asset::Aave => "AAVE",
        }
    }
}

/// Quote currencies offered by `/add_token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, poise::ChoiceParameter)]
pub enum Quote {
    #[name = "USDT"]
    Usdt,
    #[name = "EUR"]
    Eur,
    #[name = "BRL"]
    Brl,
}

impl Quote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quote::Usdt => "USDT",
            Quote::Eur => "EUR",
            Quote::Brl => "BRL",
        }
    }
}
