//! Plain-text rendering of cache contents.

use chrono::NaiveDate;

use nexus_core::cache::CacheAges;
use nexus_core::models::{Category, Company, ExpiryState, Lead, Task};
use nexus_core::stats::LeadStats;
use nexus_core::utils::{format_currency, format_date, truncate_string};

const NAME_WIDTH: usize = 28;

pub fn print_source(synced: bool, count: usize) {
    if synced {
        println!("\n{} records (synced with backend)", count);
    } else {
        println!("\n{} records (local data)", count);
    }
}

pub fn print_leads(leads: &[Lead], categories: &[Category]) {
    println!(
        "{:<w$}  {:<10}  {:>16}  {:<12}  {}",
        "NAME",
        "STATUS",
        "VALUE",
        "CATEGORY",
        "CREATED",
        w = NAME_WIDTH
    );
    for lead in leads {
        let category = lead
            .category_id
            .as_deref()
            .and_then(|id| categories.iter().find(|c| c.id == id))
            .map(|c| c.name.as_str())
            .unwrap_or("-");
        println!(
            "{:<w$}  {:<10}  {:>16}  {:<12}  {}",
            truncate_string(&lead.name, NAME_WIDTH),
            lead.status.as_str(),
            format_currency(lead.estimated_value),
            truncate_string(category, 12),
            format_date(&lead.created_at),
            w = NAME_WIDTH
        );
    }
}

pub fn print_monitor(leads: &[Lead], today: NaiveDate) {
    for lead in leads {
        let marker = match lead.expiry_state(today) {
            ExpiryState::Expired => "EXPIRED ",
            ExpiryState::ExpiringToday => "TODAY   ",
            ExpiryState::Upcoming => "        ",
            ExpiryState::NoDate => "        ",
        };
        let date = lead
            .expiration_date
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "--".to_string());
        println!(
            "{} {:<10}  {:<w$}  {}",
            marker,
            date,
            truncate_string(&lead.name, NAME_WIDTH),
            lead.status.as_str(),
            w = NAME_WIDTH
        );
    }
}

pub fn print_stats(stats: &LeadStats) {
    println!("Total leads:        {}", stats.total);
    println!("Predicted revenue:  {}", format_currency(stats.predicted_revenue));
    println!("Active:             {}", stats.active);
    println!("Won:                {}", stats.sold);
    println!("Lost/expired:       {}", stats.expired);
    println!("Conversion:         {}%", stats.conversion);
    if !stats.breakdown.is_empty() {
        println!();
        for share in &stats.breakdown {
            println!("  {:<10} {:>4}  {:>3}%", share.status.as_str(), share.count, share.percent);
        }
    }
}

pub fn print_categories(categories: &[Category]) {
    for category in categories {
        println!("{:<6} {:<20} {}", category.id, category.name, category.color);
    }
}

pub fn print_companies(companies: &[Company]) {
    for company in companies {
        println!("{}", company_row(company));
    }
}

fn company_row(company: &Company) -> String {
    format!(
        "{:<w$}  {:<18}  {}",
        truncate_string(&company.name, NAME_WIDTH),
        company.cnpj.as_deref().unwrap_or("-"),
        company.status.as_str(),
        w = NAME_WIDTH
    )
}

pub fn print_tasks(tasks: &[Task]) {
    for task in tasks {
        println!("{}", task_row(task));
    }
}

fn task_row(task: &Task) -> String {
    format!(
        "{:<10}  {:<w$}  {}/{}",
        format_date(&task.due_date),
        truncate_string(&task.title, NAME_WIDTH),
        task.priority.as_str(),
        task.status.as_str(),
        w = NAME_WIDTH
    )
}

pub fn print_status(ages: &CacheAges, tombstones: usize, remote: bool) {
    let age = |a: &Option<String>| a.clone().unwrap_or_else(|| "never".to_string());
    println!("Backend:      {}", if remote { "configured" } else { "not configured" });
    println!("Leads:        {}", age(&ages.leads));
    println!("Categories:   {}", age(&ages.categories));
    println!("Companies:    {}", age(&ages.companies));
    println!("Tasks:        {}", age(&ages.tasks));
    println!("Deleted ids:  {}", tombstones);
    println!("Last updated: {}", ages.last_updated());
}
