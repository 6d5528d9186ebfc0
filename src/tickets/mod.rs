// Support tickets

mod desk;
mod types;

pub use desk::{
    manual_ticket_reply, EscalationReason, TicketDesk, MANUAL_CONTACT, RECENTLY_CLOSED_LIMIT,
    ROUTER_CONTACT,
};
pub use types::{NewTicket, Ticket, TicketStatus};
