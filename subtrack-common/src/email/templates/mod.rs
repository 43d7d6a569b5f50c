use std::time::Duration;

pub struct RenewalLine {
    pub name: String,
    pub amount: String,
    pub renews_on: String,
}

pub struct RenewalReminderMessage {}

impl RenewalReminderMessage {
    pub fn generate(renewals: &[RenewalLine]) -> String {
        let mut rows = String::new();

        for line in renewals {
            rows.push_str(&format!(
                "<tr>
                   <td style=\"padding: 6px 12px;\">{}</td>
                   <td style=\"padding: 6px 12px;\">{}</td>
                   <td style=\"padding: 6px 12px;\">{}</td>
                 </tr>",
                line.name, line.amount, line.renews_on,
            ));
        }

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                   }}
                 </style>
               </head>
             <body>
               <h1>Upcoming renewals</h1>
               <p>The following subscriptions renew within the next week:</p>
               <table style=\"border-collapse: collapse;\">
                 <tr>
                   <th style=\"padding: 6px 12px; text-align: left;\">Subscription</th>
                   <th style=\"padding: 6px 12px; text-align: left;\">Amount</th>
                   <th style=\"padding: 6px 12px; text-align: left;\">Renews</th>
                 </tr>
                 {}
               </table>
               <p>You can pause or cancel a subscription from your dashboard before it renews.</p>
             </body>
             </html>",
            rows,
        )
    }
}

pub struct TrialLine {
    pub name: String,
    pub price: String,
    pub days_left: i64,
}

pub struct TrialEndingMessage {}

impl TrialEndingMessage {
    pub fn generate(trials: &[TrialLine]) -> String {
        let mut rows = String::new();

        for line in trials {
            let days = if line.days_left == 1 { "day" } else { "days" };

            rows.push_str(&format!(
                "<tr>
                   <td style=\"padding: 6px 12px;\">{}</td>
                   <td style=\"padding: 6px 12px;\">{} {}</td>
                   <td style=\"padding: 6px 12px;\">{}</td>
                 </tr>",
                line.name, line.days_left, days, line.price,
            ));
        }

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                   }}
                 </style>
               </head>
             <body>
               <h1>Trials ending soon</h1>
               <p>These free trials convert to paid subscriptions unless cancelled:</p>
               <table style=\"border-collapse: collapse;\">
                 <tr>
                   <th style=\"padding: 6px 12px; text-align: left;\">Subscription</th>
                   <th style=\"padding: 6px 12px; text-align: left;\">Time left</th>
                   <th style=\"padding: 6px 12px; text-align: left;\">Price after trial</th>
                 </tr>
                 {}
               </table>
             </body>
             </html>",
            rows,
        )
    }
}

pub struct HouseholdInviteMessage {}

impl HouseholdInviteMessage {
    pub fn generate(household_name: &str, accept_url: &str, invite_lifetime: Duration) -> String {
        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>You've been invited to the \"{}\" household</h1>
               <p>Joining a household lets its members see each other's shared subscriptions.</p>
               <p><a href=\"{}\">Accept the invitation</a></p>
               <p><b>This invitation expires in {} days.</b> If you weren't expecting it,
               you can ignore this email.</p>
             </body>
             </html>",
            household_name,
            accept_url,
            invite_lifetime.as_secs() / 86400,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_reminder_lists_each_subscription() {
        let lines = vec![
            RenewalLine {
                name: String::from("Netflix"),
                amount: String::from("$15.99"),
                renews_on: String::from("Sep 3, 2026"),
            },
            RenewalLine {
                name: String::from("Spotify"),
                amount: String::from("99.00 kr."),
                renews_on: String::from("Sep 5, 2026"),
            },
        ];

        let body = RenewalReminderMessage::generate(&lines);

        assert!(body.contains("Netflix"));
        assert!(body.contains("$15.99"));
        assert!(body.contains("Spotify"));
        assert!(body.contains("99.00 kr."));
        assert!(body.contains("Sep 5, 2026"));
    }

    #[test]
    fn test_trial_ending_pluralizes_days() {
        let lines = vec![
            TrialLine {
                name: String::from("Audible"),
                price: String::from("$7.95/monthly"),
                days_left: 1,
            },
            TrialLine {
                name: String::from("Hulu"),
                price: String::from("$17.99/monthly"),
                days_left: 3,
            },
        ];

        let body = TrialEndingMessage::generate(&lines);

        assert!(body.contains("1 day"));
        assert!(body.contains("3 days"));
    }

    #[test]
    fn test_household_invite_contains_link_and_lifetime() {
        let body = HouseholdInviteMessage::generate(
            "Smith Family",
            "https://app.example.com/household/accept?token=abc123",
            Duration::from_secs(7 * 86400),
        );

        assert!(body.contains("Smith Family"));
        assert!(body.contains("https://app.example.com/household/accept?token=abc123"));
        assert!(body.contains("expires in 7 days"));
    }
}
