//! Email bodies for booking and account events.

use super::Email;
use crate::config::AppConfig;
use crate::models::bookings::{self, PaymentMethod, Status};

/// Studio identity and addresses the templates need.
#[derive(Debug, Clone)]
pub struct Brand {
    pub studio_name: String,
    pub artist_name: String,
    pub admin_email: String,
    pub frontend_url: String,
}

impl From<&AppConfig> for Brand {
    fn from(config: &AppConfig) -> Self {
        Self {
            studio_name: config.studio_name.clone(),
            artist_name: config.artist_name.clone(),
            admin_email: config.admin_email.clone(),
            frontend_url: config.frontend_url.clone(),
        }
    }
}

impl Brand {
    fn signature(&self) -> String {
        format!(
            "<p>Best regards,<br>{}<br>{}</p>",
            escape(&self.artist_name),
            escape(&self.studio_name)
        )
    }

    fn admin_link(&self) -> String {
        format!(
            r#"<p><a href="{}/admin">View in Admin Dashboard</a></p>"#,
            self.frontend_url
        )
    }
}

/// Minimal HTML escaping for user-supplied text.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn money(amount: f64) -> String {
    format!("${amount:.2}")
}

fn button(href: &str, label: &str) -> String {
    format!(
        r#"<a href="{href}" style="background: #8B0000; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; font-weight: bold;">{label}</a>"#
    )
}

// ── Booking lifecycle ──

pub fn booking_created_customer(
    brand: &Brand,
    booking: &bookings::Model,
    checkout_url: Option<&str>,
) -> Email {
    let id = booking.id;
    let instructions = match (booking.payment_method, checkout_url) {
        (PaymentMethod::Stripe, Some(url)) => format!(
            "<p><strong>Next Step:</strong> Please complete your {} deposit payment to secure your booking.</p>{}",
            money(booking.deposit_amount),
            button(url, "Pay Deposit Now")
        ),
        (PaymentMethod::Stripe, None) => format!(
            "<p><strong>Next Step:</strong> Please complete your {} deposit payment from your dashboard.</p>",
            money(booking.deposit_amount)
        ),
        (PaymentMethod::Etransfer, _) => format!(
            "<p><strong>Next Step:</strong> Please send the {} deposit via Interac e-Transfer to {}.</p>\
             <p>Include booking ID #{id} in the message.</p>",
            money(booking.deposit_amount),
            escape(&brand.admin_email)
        ),
    };

    Email {
        to: booking.customer_email.clone(),
        cc: Some(brand.admin_email.clone()),
        subject: format!("Booking Created - #{id} - {}", brand.studio_name),
        html: format!(
            "<h2>New Art Commission Booking</h2>\
             <p>Thank you for booking with {studio}!</p>\
             <h3>Booking Details:</h3>\
             <ul>\
               <li><strong>Booking ID:</strong> {id}</li>\
               <li><strong>Customer:</strong> {customer}</li>\
               <li><strong>Art Type:</strong> {art}</li>\
               <li><strong>Project:</strong> {project}...</li>\
               <li><strong>Files Uploaded:</strong> {files}</li>\
             </ul>\
             {instructions}\
             <p>This booking is reserved for you. Once the deposit is received, work on your project begins.</p>\
             {signature}",
            studio = escape(&brand.studio_name),
            customer = escape(&booking.customer_name),
            art = escape(&booking.art_type),
            project = escape(&booking.description_excerpt()),
            files = booking.reference_files.0.len(),
            signature = brand.signature(),
        ),
    }
}

pub fn booking_created_admin(brand: &Brand, booking: &bookings::Model) -> Email {
    let id = booking.id;
    let (method, waiting_on) = match booking.payment_method {
        PaymentMethod::Stripe => ("STRIPE", "Customer needs to complete the deposit payment."),
        PaymentMethod::Etransfer => ("ETRANSFER", "Waiting for e-Transfer deposit."),
    };

    Email {
        to: brand.admin_email.clone(),
        cc: None,
        subject: format!("New Booking #{id} - {}", brand.studio_name),
        html: format!(
            "<h2>New Art Commission Received</h2>\
             <p>A new booking has been created:</p>\
             <ul>\
               <li><strong>Booking ID:</strong> {id}</li>\
               <li><strong>Customer:</strong> {customer}</li>\
               <li><strong>Email:</strong> {email}</li>\
               <li><strong>Phone:</strong> {phone}</li>\
               <li><strong>Art Type:</strong> {art}</li>\
               <li><strong>Description:</strong> {description}</li>\
               <li><strong>Files:</strong> {files} reference images uploaded</li>\
               <li><strong>Payment Method:</strong> {method}</li>\
             </ul>\
             {link}\
             <p>{waiting_on}</p>",
            customer = escape(&booking.customer_name),
            email = escape(&booking.customer_email),
            phone = escape(booking.customer_phone.as_deref().unwrap_or("Not provided")),
            art = escape(&booking.art_type),
            description = escape(&booking.project_description),
            files = booking.reference_files.0.len(),
            link = brand.admin_link(),
        ),
    }
}

pub fn deposit_confirmed_customer(
    brand: &Brand,
    booking: &bookings::Model,
    customer_email: &str,
) -> Email {
    let id = booking.id;
    Email {
        to: customer_email.to_string(),
        cc: Some(brand.admin_email.clone()),
        subject: format!("Deposit Payment Confirmed - {}", brand.studio_name),
        html: format!(
            "<h2>Payment Confirmed!</h2>\
             <p>Thank you for your {deposit} deposit payment for booking #{id}!</p>\
             <h3>Your Booking Details:</h3>\
             <ul>\
               <li><strong>Booking ID:</strong> {id}</li>\
               <li><strong>Customer:</strong> {customer}</li>\
               <li><strong>Art Type:</strong> {art}</li>\
               <li><strong>Project:</strong> {project}...</li>\
               <li><strong>Deposit Paid:</strong> {deposit}</li>\
               <li><strong>Status:</strong> Deposit Received - In Queue</li>\
             </ul>\
             <p>Work on your artwork will start within the next 24-48 hours.</p>\
             <p>You'll receive updates as your commission progresses.</p>\
             {signature}",
            deposit = money(booking.deposit_amount),
            customer = escape(&booking.customer_name),
            art = escape(&booking.art_type),
            project = escape(&booking.description_excerpt()),
            signature = brand.signature(),
        ),
    }
}

pub fn deposit_confirmed_admin(
    brand: &Brand,
    booking: &bookings::Model,
    customer_email: &str,
    session_id: &str,
) -> Email {
    let id = booking.id;
    Email {
        to: brand.admin_email.clone(),
        cc: None,
        subject: format!("Deposit Paid - Booking #{id}"),
        html: format!(
            "<h2>Deposit Payment Received!</h2>\
             <p>A customer has completed their deposit payment:</p>\
             <ul>\
               <li><strong>Booking ID:</strong> {id}</li>\
               <li><strong>Customer:</strong> {customer}</li>\
               <li><strong>Email:</strong> {email}</li>\
               <li><strong>Amount:</strong> {deposit}</li>\
               <li><strong>Stripe Session:</strong> {session}</li>\
             </ul>\
             {link}",
            customer = escape(&booking.customer_name),
            email = escape(customer_email),
            deposit = money(booking.deposit_amount),
            session = escape(session_id),
            link = brand.admin_link(),
        ),
    }
}

/// Customer email sent after an operator changes a booking's status.
pub fn status_update(brand: &Brand, booking: &bookings::Model) -> Email {
    let id = booking.id;
    let body = match booking.status {
        Status::Completed => {
            "<p>Your artwork is ready! The final files will be sent to you soon.</p>\
             <p>Please complete the remaining payment to receive your artwork.</p>"
        }
        Status::InProgress => {
            "<p>Great news! Work on your artwork has started.</p>\
             <p>You'll be kept updated on the progress.</p>"
        }
        Status::Cancelled => {
            "<p>Your booking has been cancelled. The deposit will be refunded within 5-7 business days.</p>\
             <p>If you have any questions, please get in touch.</p>"
        }
        _ => "",
    };

    Email {
        to: booking.customer_email.clone(),
        cc: Some(brand.admin_email.clone()),
        subject: format!("Booking Update #{id} - {}", brand.studio_name),
        html: format!(
            "<h2>Booking Status Update</h2>\
             <p>Your booking #{id} has been updated:</p>\
             <ul>\
               <li><strong>New Status:</strong> {status}</li>\
               <li><strong>Art Type:</strong> {art}</li>\
               <li><strong>Project:</strong> {project}...</li>\
             </ul>\
             {body}\
             {signature}",
            status = booking.status.label(),
            art = escape(&booking.art_type),
            project = escape(&booking.description_excerpt()),
            signature = brand.signature(),
        ),
    }
}

pub fn invoice_sent(
    brand: &Brand,
    booking: &bookings::Model,
    total: f64,
    remaining: f64,
    invoice_url: Option<&str>,
) -> Email {
    let id = booking.id;
    let pay = invoice_url
        .map(|url| {
            format!(
                "<p>Click the button below to pay your invoice:</p>{}",
                button(url, "Pay Invoice Now")
            )
        })
        .unwrap_or_else(|| "<p>The invoice has been sent to you separately.</p>".to_string());

    Email {
        to: booking.customer_email.clone(),
        cc: Some(brand.admin_email.clone()),
        subject: format!("Invoice for Booking #{id} - {}", brand.studio_name),
        html: format!(
            "<h2>Invoice - Final Payment Required</h2>\
             <p>Your artwork for booking #{id} is complete!</p>\
             <p>Please complete the remaining payment to receive your final artwork files.</p>\
             <h3>Invoice Details:</h3>\
             <ul>\
               <li><strong>Total Amount:</strong> {total}</li>\
               <li><strong>Deposit Paid:</strong> {deposit}</li>\
               <li><strong>Remaining Balance:</strong> {remaining}</li>\
               <li><strong>Due Date:</strong> 7 days from today</li>\
             </ul>\
             {pay}\
             <p>Once payment is received, the high-resolution files will be sent immediately.</p>\
             {signature}",
            total = money(total),
            deposit = money(booking.deposit_amount),
            remaining = money(remaining),
            signature = brand.signature(),
        ),
    }
}

pub fn final_payment_received(brand: &Brand, booking: &bookings::Model) -> Email {
    let id = booking.id;
    let total = booking.total_amount.unwrap_or(booking.deposit_amount);

    Email {
        to: booking.customer_email.clone(),
        cc: Some(brand.admin_email.clone()),
        subject: "Final Payment Received - Artwork Ready!".to_string(),
        html: format!(
            "<h2>Artwork Complete &amp; Payment Received!</h2>\
             <p>Congratulations! Your final payment for booking #{id} has been received.</p>\
             <h3>What's Next:</h3>\
             <p>The high-resolution artwork files will be sent within the next 24 hours.</p>\
             <h3>Booking Summary:</h3>\
             <ul>\
               <li><strong>Total Amount:</strong> {total}</li>\
               <li><strong>Deposit:</strong> {deposit}</li>\
               <li><strong>Final Payment:</strong> {balance}</li>\
               <li><strong>Status:</strong> Completed</li>\
             </ul>\
             <p>Thank you for your business! If you need revisions, just reply to this email.</p>\
             {signature}",
            total = money(total),
            deposit = money(booking.deposit_amount),
            balance = money(booking.remaining_balance().unwrap_or_default()),
            signature = brand.signature(),
        ),
    }
}

/// Operator alert for a payment that arrived after the booking moved on,
/// e.g. a deposit paid on a booking that was already cancelled.
pub fn payment_needs_review(
    brand: &Brand,
    booking: &bookings::Model,
    payment: &str,
    reference: &str,
) -> Email {
    let id = booking.id;
    Email {
        to: brand.admin_email.clone(),
        cc: None,
        subject: format!("Payment Needs Review - Booking #{id}"),
        html: format!(
            "<h2>Payment Received Outside the Usual Flow</h2>\
             <p>Stripe confirmed a {payment} for a booking whose status is <strong>{status}</strong>. \
             The payment has been recorded and the status was left unchanged.</p>\
             <ul>\
               <li><strong>Booking ID:</strong> {id}</li>\
               <li><strong>Customer:</strong> {customer}</li>\
               <li><strong>Email:</strong> {email}</li>\
               <li><strong>Stripe Reference:</strong> {reference}</li>\
             </ul>\
             {link}",
            payment = escape(payment),
            status = booking.status,
            customer = escape(&booking.customer_name),
            email = escape(&booking.customer_email),
            reference = escape(reference),
            link = brand.admin_link(),
        ),
    }
}

// ── Accounts ──

pub fn welcome(brand: &Brand, to: &str, full_name: &str) -> Email {
    Email {
        to: to.to_string(),
        cc: None,
        subject: format!("Welcome to {}!", brand.studio_name),
        html: format!(
            "<h2>Welcome to {studio}, {name}!</h2>\
             <p>Your account has been created successfully.</p>\
             <p>You can now start booking custom art commissions.</p>\
             {signature}",
            studio = escape(&brand.studio_name),
            name = escape(full_name),
            signature = brand.signature(),
        ),
    }
}

pub fn password_reset(brand: &Brand, to: &str, reset_link: &str) -> Email {
    Email {
        to: to.to_string(),
        cc: None,
        subject: format!("Password Reset - {}", brand.studio_name),
        html: format!(
            "<h2>Password Reset Request</h2>\
             <p>You requested a password reset for your {studio} account.</p>\
             <p>Click the link below to reset your password:</p>\
             {button}\
             <p>This link expires in 1 hour.</p>\
             <p>If you didn't request this, please ignore this email.</p>\
             {signature}",
            studio = escape(&brand.studio_name),
            button = button(reset_link, "Reset Password"),
            signature = brand.signature(),
        ),
    }
}

pub fn password_reset_done(brand: &Brand, to: &str) -> Email {
    Email {
        to: to.to_string(),
        cc: None,
        subject: format!("Password Reset Successful - {}", brand.studio_name),
        html: format!(
            "<h2>Password Reset Successful</h2>\
             <p>Your password has been successfully reset.</p>\
             <p>You can now log in with your new password.</p>\
             {}",
            brand.signature()
        ),
    }
}
