//! Reply selection
//!
//! Every intent maps to one fixed line. Only the farewell carries a side
//! effect: the call is torn down once the line has been spoken.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;

/// Line spoken when a call connects
pub const OPENING_GREETING: &str = "Hello! Thank you for calling Style and Shine Barber Shop in Ahmedabad. This is your AI assistant. How may I help you today?";

/// Action to run after a reply has been spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    #[default]
    None,
    /// Hang up after the grace delay
    EndCall,
}

/// Agent reply for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: &'static str,
    pub side_effect: SideEffect,
}

impl Reply {
    const fn say(text: &'static str) -> Self {
        Self {
            text,
            side_effect: SideEffect::None,
        }
    }

    /// Whether the call should end once this reply is spoken
    pub fn ends_call(&self) -> bool {
        self.side_effect == SideEffect::EndCall
    }
}

/// Pick the reply for an intent
pub fn respond(intent: Intent) -> Reply {
    match intent {
        Intent::Greeting => Reply::say(
            "Hello! Welcome to Style and Shine Barber Shop in Ahmedabad. How can I help you today?",
        ),
        Intent::BookingRequest => Reply::say(
            "Great! I can help you book an appointment. What day works best for you?",
        ),
        Intent::DayProvided => Reply::say(
            "Perfect! What time would you prefer? We are open from 9 AM to 8 PM.",
        ),
        Intent::TimeOrPeriodProvided => Reply::say(
            "Excellent! And what service would you like? We offer haircut, shave, beard trim, hair coloring, and combo packages.",
        ),
        Intent::ServiceProvided => Reply::say(
            "Great choice! Can I have your name and phone number to confirm the booking?",
        ),
        Intent::PriceInquiry => Reply::say(
            "Our haircut is 300 rupees, shave is 150 rupees, beard trim is 200 rupees, and our combo package is 500 rupees.",
        ),
        Intent::LocationInquiry => Reply::say(
            "We are located in C G Road, Ahmedabad, Gujarat. Near Pantaloons showroom.",
        ),
        Intent::CancelOrReschedule => Reply::say(
            "No problem! Please provide your booking reference number or phone number and I will help you with that.",
        ),
        Intent::Farewell => Reply {
            text: "Thank you for calling Style and Shine Barber Shop! Have a great day!",
            side_effect: SideEffect::EndCall,
        },
        Intent::Unrecognized => Reply::say(
            "I understand. Could you please provide more details so I can better assist you?",
        ),
    }
}
