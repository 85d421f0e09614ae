use crate::models::{BoardSnapshot, LinkStatus};

pub fn render_index(snapshot: &BoardSnapshot) -> String {
    INDEX_HTML
        .replace("{{STATUS}}", &escape_html(&status_text(&snapshot.status)))
        .replace("{{SENSORS}}", &snapshot.charts.len().to_string())
        .replace("{{UPDATED}}", snapshot.updated_at.as_deref().unwrap_or("--"))
}

pub fn status_text(status: &LinkStatus) -> String {
    match status {
        LinkStatus::Connecting => "Connecting to the sensor feed...".to_string(),
        LinkStatus::Discovering => "Loading sensors...".to_string(),
        LinkStatus::Live { subjects: 1 } => "Live: 1 sensor".to_string(),
        LinkStatus::Live { subjects } => format!("Live: {subjects} sensors"),
        LinkStatus::LoadFailed { reason } => format!("Failed to load sensor data ({reason})"),
        LinkStatus::ChannelDown { reason } => format!("Sensor feed unavailable ({reason})"),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Sensor Dashboard</title>
  <style>
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #eef4f8;
      --bg-2: #bcd8ea;
      --ink: #22303a;
      --accent: #2196f3;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #dfeef7 60%, #f4f8fb 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(1080px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
      animation: rise 600ms ease;
    }

    header {
      display: flex;
      flex-direction: column;
      gap: 6px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    .subtitle {
      margin: 0;
      color: #5a6770;
      font-size: 1rem;
    }

    .summary {
      margin: 0;
      display: flex;
      flex-wrap: wrap;
      gap: 6px 18px;
      font-size: 0.95rem;
      color: var(--accent-2);
    }

    .summary strong {
      font-weight: 600;
    }

    .sensors {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(420px, 1fr));
      gap: 20px;
    }

    .sensor {
      background: white;
      border-radius: 20px;
      padding: 16px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 10px;
    }

    .sensor h2 {
      margin: 0;
      font-size: 1.15rem;
    }

    .sensor .meta {
      margin: 0;
      color: #6a7780;
      font-size: 0.9rem;
    }

    .sensor svg {
      width: 100%;
      height: 240px;
      display: block;
    }

    .sensor svg text {
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
    }

    .chart-line {
      fill: none;
      stroke: var(--accent);
      stroke-width: 3;
    }

    .chart-point {
      fill: white;
      stroke: var(--accent);
      stroke-width: 2;
    }

    .chart-grid {
      stroke: rgba(47, 72, 88, 0.12);
    }

    .chart-label {
      fill: #72808a;
      font-size: 11px;
    }

    .status {
      font-size: 0.95rem;
      color: #5a6770;
      min-height: 1.2em;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    @keyframes rise {
      from {
        opacity: 0;
        transform: translateY(18px);
      }
      to {
        opacity: 1;
        transform: translateY(0);
      }
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
      .sensors {
        grid-template-columns: 1fr;
      }
    }
  </style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Sensor Dashboard</h1>
      <p class="subtitle">Live readings from your wardrobe sensors.</p>
    </header>

    <p class="summary">
      <span>Sensors: <strong id="sensor-count">{{SENSORS}}</strong></span>
      <span>Last update: <strong id="updated">{{UPDATED}}</strong></span>
    </p>

    <div class="status" id="status">{{STATUS}}</div>

    <section class="sensors" id="sensor-data"></section>
  </main>
  <script>
    const statusEl = document.getElementById('status');
    const sensorsEl = document.getElementById('sensor-data');
    const countEl = document.getElementById('sensor-count');
    const updatedEl = document.getElementById('updated');
    const cards = new Map();

    const escapeText = (text) => String(text ?? '')
      .replace(/&/g, '&amp;')
      .replace(/</g, '&lt;')
      .replace(/>/g, '&gt;');

    const setStatus = (status) => {
      switch (status.state) {
        case 'connecting':
          statusEl.textContent = 'Connecting to the sensor feed...';
          statusEl.dataset.type = 'info';
          break;
        case 'discovering':
          statusEl.textContent = 'Loading sensors...';
          statusEl.dataset.type = 'info';
          break;
        case 'live':
          statusEl.textContent = `Live: ${status.subjects} sensor${status.subjects === 1 ? '' : 's'}`;
          statusEl.dataset.type = 'ok';
          break;
        case 'load_failed':
          statusEl.textContent = `Failed to load sensor data (${status.reason})`;
          statusEl.dataset.type = 'error';
          break;
        default:
          statusEl.textContent = `Sensor feed unavailable (${status.reason})`;
          statusEl.dataset.type = 'error';
      }
    };

    const formatAxisValue = (value) => {
      const rounded = Math.round(value * 10) / 10;
      return Number.isInteger(rounded) ? rounded.toString() : rounded.toFixed(1);
    };

    const renderLineChart = (svg, labels, values) => {
      if (!values.length) {
        svg.innerHTML = '<text class="chart-label" x="50%" y="50%" text-anchor="middle">Waiting for readings</text>';
        return;
      }

      const width = 600;
      const height = 240;
      const paddingX = 48;
      const paddingY = 34;
      const top = 20;

      let min = Math.min(...values);
      let max = Math.max(...values);
      if (min === max) {
        min -= 1;
        max += 1;
      }

      const range = max - min;
      const xStep = values.length > 1 ? (width - paddingX * 2) / (values.length - 1) : 0;
      const scaleY = (height - top - paddingY) / range;
      const x = (index) => paddingX + index * xStep;
      const y = (value) => height - paddingY - (value - min) * scaleY;

      const path = values
        .map((value, index) => `${index === 0 ? 'M' : 'L'} ${x(index).toFixed(2)} ${y(value).toFixed(2)}`)
        .join(' ');

      const ticks = 4;
      let grid = '';
      for (let i = 0; i <= ticks; i += 1) {
        const value = min + (range * i) / ticks;
        const yPos = y(value);
        grid += `<line class="chart-grid" x1="${paddingX}" y1="${yPos}" x2="${width - paddingX}" y2="${yPos}" />`;
        grid += `<text class="chart-label" x="${paddingX - 10}" y="${yPos + 4}" text-anchor="end">${formatAxisValue(value)}</text>`;
      }

      const labelEvery = Math.max(1, Math.ceil(labels.length / 6));
      const xLabels = labels
        .map((label, index) => {
          if (index % labelEvery !== 0) {
            return '';
          }
          return `<text class="chart-label" x="${x(index)}" y="${height - paddingY + 18}" text-anchor="middle">${escapeText(label)}</text>`;
        })
        .join('');

      const circles = values
        .map((value, index) => `<circle class="chart-point" cx="${x(index)}" cy="${y(value)}" r="3" />`)
        .join('');

      svg.setAttribute('viewBox', `0 0 ${width} ${height}`);
      svg.innerHTML = `
        ${grid}
        <path class="chart-line" d="${path}" />
        ${circles}
        ${xLabels}
      `;
    };

    const cardFor = (chart) => {
      let card = cards.get(chart.id);
      if (!card) {
        card = document.createElement('article');
        card.className = 'sensor';
        cards.set(chart.id, card);
      }
      card.innerHTML = `
        <h2>(${escapeText(chart.kind)}) (${escapeText(chart.unit)})</h2>
        <p class="meta">Address: ${escapeText(chart.address || 'unknown')}</p>
        <svg role="img" aria-label="${escapeText(chart.kind)} readings"></svg>
      `;
      return card;
    };

    const render = (snapshot) => {
      setStatus(snapshot.status);
      countEl.textContent = snapshot.charts.length;
      updatedEl.textContent = snapshot.updated_at || '--';

      const seen = new Set();
      snapshot.charts.forEach((chart) => {
        seen.add(chart.id);
        const card = cardFor(chart);
        sensorsEl.appendChild(card);
        renderLineChart(card.querySelector('svg'), chart.labels, chart.values);
      });

      for (const [id, card] of cards) {
        if (!seen.has(id)) {
          card.remove();
          cards.delete(id);
        }
      }
    };

    const refresh = async () => {
      const res = await fetch('/api/windows');
      if (!res.ok) {
        throw new Error('Unable to load sensor windows');
      }
      render(await res.json());
    };

    const poll = () => {
      refresh()
        .catch((err) => {
          statusEl.textContent = err.message;
          statusEl.dataset.type = 'error';
        })
        .finally(() => setTimeout(poll, 1000));
    };

    poll();
  </script>
</body>
</html>
"#;
