//! Prompt templates. Each slice is embedded as a compact CSV table.

use crate::context::{ContextSlice, DecisionContext, DecisionMode};
use crate::oracle::Language;
use crate::store::SeriesId;

#[derive(Debug, Clone)]
pub struct PromptRenderer {
    language: Language,
    symbol: String,
    session: String,
}

impl PromptRenderer {
    pub fn new(language: Language, symbol: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            language,
            symbol: symbol.into(),
            session: session.into(),
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn render(&self, ctx: &DecisionContext<'_>) -> String {
        let data = self.tables(ctx);
        let symbol = &self.symbol;
        let session = &self.session;
        let price = ctx.current_price;
        match (self.language, ctx.mode) {
            (Language::ZhTw, DecisionMode::PerBar) => format!(
                "你是專業的加密貨幣當沖操盤手，交易標的為 {symbol}。請依據以下資料判斷現在是否為進場或出場的好時機：\n\n\
                 【多週期走勢資料】\n{data}\
                 【當前價格】:{price}\n\n\
                 請回答：\n\
                 1. 建議操作：（買入/賣出/持有/觀望）\n\
                 2. 主要原因（人類能理解的走勢邏輯）\n"
            ),
            (Language::ZhTw, DecisionMode::SessionPlan) => format!(
                "你是頂級的 {symbol} 短線交易員。\n\
                 請根據以下走勢資料，針對今天的交易時段（{session}）給出交易規劃：\n\n\
                 【多週期走勢資料】\n{data}\
                 【當前價格】:{price}\n\n\
                 請輸出：\n\
                 1. 今日大方向（偏多/偏空/盤整）\n\
                 2. 關鍵支撐位置\n\
                 3. 關鍵壓力位置\n\
                 4. 進場策略（例如：回踩支撐站穩做多 / 突破壓力回踩站穩做多）\n\
                 5. 思考邏輯（為什麼這樣設定）\n"
            ),
            (Language::En, DecisionMode::PerBar) => format!(
                "You are a professional intraday trader of {symbol}. Using the data below, decide whether now is a good moment to enter or exit a position.\n\n\
                 [Multi-timeframe bars]\n{data}\
                 [Current price]: {price}\n\n\
                 Answer with:\n\
                 1. Action: one of BUY / SELL / HOLD / WAIT\n\
                 2. Main reasons (price-action logic a human can follow)\n"
            ),
            (Language::En, DecisionMode::SessionPlan) => format!(
                "You are a top short-term trader of {symbol}.\n\
                 Using the data below, write a trading plan for today's session ({session}).\n\n\
                 [Multi-timeframe bars]\n{data}\
                 [Current price]: {price}\n\n\
                 Output:\n\
                 1. Bias for the day: BULLISH / BEARISH / RANGE\n\
                 2. Key support level\n\
                 3. Key resistance level\n\
                 4. Entry trigger (e.g. hold above support after a pullback, go long)\n\
                 5. Reasoning behind the levels\n"
            ),
        }
    }

    fn label(&self, slice: &ContextSlice<'_>) -> String {
        let tf = slice.timeframe;
        match (self.language, slice.series) {
            (Language::ZhTw, SeriesId::Weekly) => "周線資料:".to_string(),
            (Language::ZhTw, SeriesId::Daily) => "日線資料:".to_string(),
            (Language::ZhTw, SeriesId::Hourly) => "小時線資料:".to_string(),
            (Language::ZhTw, SeriesId::Primary) => format!("主週期資料({tf}):"),
            (Language::En, SeriesId::Weekly) => "Weekly bars:".to_string(),
            (Language::En, SeriesId::Daily) => "Daily bars:".to_string(),
            (Language::En, SeriesId::Hourly) => "Hourly bars:".to_string(),
            (Language::En, SeriesId::Primary) => format!("Primary bars ({tf}):"),
        }
    }

    fn tables(&self, ctx: &DecisionContext<'_>) -> String {
        let mut out = String::new();
        for slice in &ctx.slices {
            out.push_str(&self.label(slice));
            out.push('\n');
            if slice.bars.is_empty() {
                out.push_str(match self.language {
                    Language::ZhTw => "（無資料）\n",
                    Language::En => "(no data)\n",
                });
            } else {
                out.push_str("timestamp,open,high,low,close,volume\n");
                for b in slice.bars {
                    out.push_str(&format!(
                        "{},{},{},{},{},{}\n",
                        b.timestamp.format("%Y-%m-%d %H:%M"),
                        b.open,
                        b.high,
                        b.low,
                        b.close,
                        b.volume
                    ));
                }
            }
            out.push('\n');
        }
        out
    }
}
