//! Breakout-and-pullback signal engine.
//!
//! One call to [`BreakoutEngine::evaluate`] per invocation, in this order:
//!
//! 1. Data sufficiency guard (`ma_days + 2` bars)
//! 2. Current and previous moving average
//! 3. Trailing run-up filter (skips everything below, exits included)
//! 4. Exits for a held long: trend stop-loss, then shadow take-profit
//! 5. Pending-buy day: bearish, shrinking volume, at or after `buy_time`
//! 6. Breakout detection (overwrites any pending plan)
//!
//! The engine never schedules itself. A caller holding a pending plan must
//! invoke it at least once at or after `buy_time` on the day after the
//! breakout, otherwise the plan expires unexecuted.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::config::SignalConfig;
use crate::domain::indicator::{ratio, recent_increase, recent_slice, sma_close};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::order::{OrderInstruction, OrderReason};
use crate::domain::position::Position;
use crate::domain::signal::SignalState;

/// Everything the engine reads for one invocation.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    pub code: &'a str,
    pub now: NaiveDateTime,
    /// Oldest first, ending at or before `now`.
    pub bars: &'a [OhlcvBar],
    pub position: Option<&'a Position>,
    pub cash: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    InsufficientHistory { have: usize, need: usize },
    RecentRunUp { increase: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignalEvent {
    Skipped(SkipReason),
    StopLoss {
        close: f64,
        current_ma: f64,
    },
    TakeProfit {
        shadow_ratio: f64,
        volume_ratio: f64,
    },
    PullbackBuy {
        price: f64,
        amount: f64,
    },
    AwaitingBuyTime {
        time: NaiveTime,
    },
    VolumeNotShrunk {
        volume_ratio: f64,
    },
    PlanCancelled,
    PlanExpired {
        breakout_date: NaiveDate,
    },
    BreakoutDetected {
        price_increase: f64,
        volume_increase: f64,
        close: f64,
        current_ma: f64,
    },
    /// A ratio had a zero denominator; the condition using it was treated as false.
    RatioUndefined {
        metric: &'static str,
    },
}

/// Outcome of one invocation: at most one order, plus what happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub order: Option<OrderInstruction>,
    pub events: Vec<SignalEvent>,
}

impl Evaluation {
    fn skipped(reason: SkipReason) -> Self {
        Evaluation {
            order: None,
            events: vec![SignalEvent::Skipped(reason)],
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SignalEvent::Skipped(_)))
    }

    pub fn breakout_detected(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, SignalEvent::BreakoutDetected { .. }))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BreakoutEngine {
    config: SignalConfig,
}

impl BreakoutEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn evaluate(&self, state: &mut SignalState, session: &Session<'_>) -> Evaluation {
        let cfg = &self.config;
        let code = session.code;
        let need = cfg.window_len();
        let have = session.bars.len();

        if have < need {
            tracing::info!(code, have, need, "insufficient history, skipping session");
            return Evaluation::skipped(SkipReason::InsufficientHistory { have, need });
        }

        let window = &session.bars[have - need..];
        let (Some(current_ma), Some(previous_ma)) = (
            sma_close(window, cfg.ma_days),
            sma_close(&window[..need - 1], cfg.ma_days),
        ) else {
            return Evaluation::skipped(SkipReason::InsufficientHistory { have, need });
        };
        let today = &window[need - 1];
        let yesterday = &window[need - 2];

        let mut eval = Evaluation::default();

        match recent_increase(recent_slice(window, cfg.recent_days)) {
            Some(increase) if increase > cfg.recent_increase_ratio => {
                tracing::info!(
                    code,
                    increase = %format!("{:.2}%", increase * 100.0),
                    "recent run-up too large, skipping session"
                );
                return Evaluation::skipped(SkipReason::RecentRunUp { increase });
            }
            Some(_) => {}
            None => undefined(&mut eval, code, "recent_increase"),
        }

        if session.position.is_some_and(Position::is_long) {
            if today.close < current_ma {
                tracing::info!(
                    code,
                    close = today.close,
                    current_ma,
                    "stop-loss: close fell below moving average"
                );
                eval.events.push(SignalEvent::StopLoss {
                    close: today.close,
                    current_ma,
                });
                eval.order = Some(OrderInstruction::Liquidate {
                    code: code.to_string(),
                    reason: OrderReason::StopLoss,
                });
                return eval;
            }

            if let Some(shadow_ratio) = today.upper_shadow_ratio() {
                match ratio(today.volume, yesterday.volume) {
                    Some(volume_ratio)
                        if shadow_ratio > cfg.upper_shadow_ratio
                            && volume_ratio > cfg.shadow_volume_ratio =>
                    {
                        tracing::info!(
                            code,
                            shadow_ratio = %format!("{:.2}%", shadow_ratio * 100.0),
                            volume_ratio,
                            "take-profit: long upper shadow on expanding volume"
                        );
                        eval.events.push(SignalEvent::TakeProfit {
                            shadow_ratio,
                            volume_ratio,
                        });
                        eval.order = Some(OrderInstruction::Liquidate {
                            code: code.to_string(),
                            reason: OrderReason::TakeProfit,
                        });
                        return eval;
                    }
                    Some(_) => {}
                    None => undefined(&mut eval, code, "shadow_volume_ratio"),
                }
            }
        }

        let session_date = session.now.date();
        if let Some(buy_date) = state.pending_buy_date() {
            if session_date == buy_date {
                self.handle_pending_buy(state, session, today, yesterday, &mut eval);
            } else if session_date > buy_date {
                let breakout_date = state.breakout_date.unwrap_or(buy_date);
                tracing::info!(code, %breakout_date, "pending buy plan expired");
                state.disarm();
                eval.events.push(SignalEvent::PlanExpired { breakout_date });
            }
        }

        let price_increase = ratio(today.close, yesterday.close).map(|r| r - 1.0);
        let volume_increase = ratio(today.volume, yesterday.volume);
        match (price_increase, volume_increase) {
            (Some(price_increase), Some(volume_increase)) => {
                if price_increase > cfg.price_increase_ratio
                    && volume_increase > cfg.volume_increase_ratio
                    && today.close > current_ma
                    && current_ma > previous_ma
                {
                    tracing::info!(
                        code,
                        price_increase = %format!("{:.2}%", price_increase * 100.0),
                        volume_increase,
                        close = today.close,
                        current_ma,
                        "breakout detected"
                    );
                    state.arm(session_date);
                    eval.events.push(SignalEvent::BreakoutDetected {
                        price_increase,
                        volume_increase,
                        close: today.close,
                        current_ma,
                    });
                }
            }
            (None, _) => undefined(&mut eval, code, "price_increase"),
            (_, None) => undefined(&mut eval, code, "volume_increase"),
        }

        eval
    }

    fn handle_pending_buy(
        &self,
        state: &mut SignalState,
        session: &Session<'_>,
        today: &OhlcvBar,
        yesterday: &OhlcvBar,
        eval: &mut Evaluation,
    ) {
        let cfg = &self.config;
        let code = session.code;

        if !today.is_bearish() {
            tracing::info!(code, "session after breakout closed bullish, cancelling buy plan");
            state.disarm();
            eval.events.push(SignalEvent::PlanCancelled);
            return;
        }

        let Some(volume_ratio) = ratio(today.volume, yesterday.volume) else {
            undefined(eval, code, "pullback_volume_ratio");
            return;
        };
        if volume_ratio >= cfg.volume_decrease_ratio {
            tracing::info!(
                code,
                volume_ratio = %format!("{:.2}", volume_ratio),
                "volume has not shrunk enough for the pullback buy"
            );
            eval.events.push(SignalEvent::VolumeNotShrunk { volume_ratio });
            return;
        }

        let time = session.now.time();
        if time < cfg.buy_time {
            tracing::info!(code, %time, buy_time = %cfg.buy_time, "waiting for buy time");
            eval.events.push(SignalEvent::AwaitingBuyTime { time });
            return;
        }

        let amount = session.cash * cfg.buy_cash_fraction;
        tracing::info!(
            code,
            price = today.close,
            amount,
            "pullback buy: bearish session on shrinking volume"
        );
        state.record_buy(today.close);
        eval.events.push(SignalEvent::PullbackBuy {
            price: today.close,
            amount,
        });
        eval.order = Some(OrderInstruction::BuyValue {
            code: code.to_string(),
            amount,
            reason: OrderReason::PullbackBuy,
        });
    }
}

fn undefined(eval: &mut Evaluation, code: &str, metric: &'static str) {
    tracing::warn!(code, metric, "ratio undefined (zero denominator), condition treated as false");
    eval.events.push(SignalEvent::RatioUndefined { metric });
}
